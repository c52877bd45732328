// crates/config/src/validator.rs

use chrono_tz::Tz;
use pipa_core::{PipaError, PipaResult};
use tracing::warn;

use crate::PipaConfig;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &PipaConfig) -> PipaResult<()> {
        if config.app.timezone.parse::<Tz>().is_err() {
            return Err(PipaError::Config(format!(
                "Unknown timezone '{}'",
                config.app.timezone
            )));
        }

        if config.temporal.max_range_days < 1 {
            return Err(PipaError::Config(
                "temporal.max_range_days must be >= 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&config.music.volume_step) || config.music.volume_step == 0.0 {
            return Err(PipaError::Config(
                "music.volume_step must be in (0.0, 1.0]".to_string(),
            ));
        }

        if config.news.max_items == 0 {
            return Err(PipaError::Config(
                "news.max_items must be > 0".to_string(),
            ));
        }

        // Missing defaults are legal; the routes answer with guidance text.
        if config.weather.default_entity.is_none() {
            warn!("No default weather entity configured");
        }
        if config.calendar.default_entity.is_none() {
            warn!("No default calendar entity configured");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        assert!(ConfigValidator::validate(&PipaConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut config = PipaConfig::default();
        config.app.timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            ConfigValidator::validate(&config),
            Err(PipaError::Config(_))
        ));
    }

    #[test]
    fn rejects_zero_range() {
        let mut config = PipaConfig::default();
        config.temporal.max_range_days = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
