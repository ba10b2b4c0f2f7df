//! Clasificación de campos de metadata en sensibles o benignos.

use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sensitivity {
    Sensitive,
    Benign,
}

impl Sensitivity {
    pub fn is_sensitive(self) -> bool {
        matches!(self, Sensitivity::Sensitive)
    }
}

/// Tabla de campos sensibles. Los campos que no aparecen se consideran benignos.
#[derive(Clone, Debug)]
pub struct TagPolicy {
    needles: Vec<String>,
}

impl TagPolicy {
    pub fn new(sensitive_tags: &BTreeSet<String>) -> Self {
        Self {
            needles: sensitive_tags.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Clasifica un campo por nombre. Todo el bloque GPS es sensible sin excepción.
    pub fn classify(&self, name: &str, in_gps_block: bool) -> Sensitivity {
        if in_gps_block {
            return Sensitivity::Sensitive;
        }

        let name = name.to_lowercase();
        if self.needles.iter().any(|needle| name.contains(needle.as_str())) {
            Sensitivity::Sensitive
        } else {
            Sensitivity::Benign
        }
    }

    pub fn classify_field(&self, field: &exif::Field) -> Sensitivity {
        let in_gps_block = field.tag.context() == exif::Context::Gps;
        self.classify(&field.tag.to_string(), in_gps_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn default_policy() -> TagPolicy {
        TagPolicy::new(&Config::default().sensitive_tags)
    }

    #[test]
    fn listed_tags_are_sensitive() {
        let policy = default_policy();
        for name in ["DateTime", "Make", "Model", "Software", "GPSInfo", "MakerNote"] {
            assert_eq!(policy.classify(name, false), Sensitivity::Sensitive, "{name}");
        }
    }

    #[test]
    fn matching_uses_containment_and_ignores_case() {
        let policy = default_policy();
        assert!(policy.classify("LensSerialNumber", false).is_sensitive());
        assert!(policy.classify("DateTimeOriginal", false).is_sensitive());
        assert!(policy.classify("LensMake", false).is_sensitive());
        assert!(policy.classify("CAMERAOWNERNAME", false).is_sensitive());
    }

    #[test]
    fn unlisted_tags_default_to_benign() {
        let policy = default_policy();
        assert_eq!(policy.classify("Orientation", false), Sensitivity::Benign);
        assert_eq!(policy.classify("ExposureTime", false), Sensitivity::Benign);
        assert_eq!(policy.classify("ColorSpace", false), Sensitivity::Benign);
    }

    #[test]
    fn whole_gps_block_is_sensitive() {
        let policy = TagPolicy::new(&BTreeSet::new());
        assert!(policy.classify("GPSSpeedRef", true).is_sensitive());
        assert!(!policy.classify("GPSSpeedRef", false).is_sensitive());
    }

    #[test]
    fn classify_field_detects_gps_context() {
        let policy = TagPolicy::new(&BTreeSet::new());
        let field = exif::Field {
            tag: exif::Tag::GPSDestBearing,
            ifd_num: exif::In::PRIMARY,
            value: exif::Value::Rational(vec![exif::Rational { num: 90, denom: 1 }]),
        };
        assert!(policy.classify_field(&field).is_sensitive());

        let orientation = exif::Field {
            tag: exif::Tag::Orientation,
            ifd_num: exif::In::PRIMARY,
            value: exif::Value::Short(vec![1]),
        };
        assert!(!policy.classify_field(&orientation).is_sensitive());
    }
}
