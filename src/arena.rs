use crate::config::ROBOT_SLOTS;
use crate::error::ConfigError;
use log::warn;
use rand::Rng;

/// Starting pose of one robot, before the random angle offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StartPose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// Arena setup: robot starting poses and the random heading perturbation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArenaConfig {
    pub start: [StartPose; ROBOT_SLOTS],
    pub max_random_angle_offset: f64,
}

const REQUIRED_KEYS: [&str; 6] = [
    "ROBOT_0_X",
    "ROBOT_0_Y",
    "ROBOT_0_ANGLE",
    "ROBOT_1_X",
    "ROBOT_1_Y",
    "ROBOT_1_ANGLE",
];

impl ArenaConfig {
    /// Parse whitespace-separated `KEY value` pairs, stopping at `END`.
    ///
    /// All six robot pose keys are required. Unknown keys are skipped
    /// together with their value.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut tokens = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)));

        let mut config = ArenaConfig::default();
        let mut seen = [false; REQUIRED_KEYS.len()];

        while let Some((line, key)) = tokens.next() {
            if key == "END" {
                break;
            }
            let Some((_, raw)) = tokens.next() else {
                return Err(ConfigError::MissingValue {
                    key: key.to_string(),
                    line,
                });
            };
            let parse_value = || {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ConfigError::InvalidNumber {
                        key: key.to_string(),
                        value: raw.to_string(),
                        line,
                    })
            };

            if key == "MAX_RANDOM_ANGLE_OFFSET" {
                let offset = parse_value()?;
                if offset < 0.0 {
                    return Err(ConfigError::InvalidAngleOffset(offset));
                }
                config.max_random_angle_offset = offset;
                continue;
            }

            match REQUIRED_KEYS.iter().position(|k| *k == key) {
                Some(index) => {
                    let value = parse_value()?;
                    let pose = &mut config.start[index / 3];
                    match index % 3 {
                        0 => pose.x = value,
                        1 => pose.y = value,
                        _ => pose.angle = value,
                    }
                    seen[index] = true;
                }
                None => warn!(target: "config", "Line {}: ignoring unknown key {}", line, key),
            }
        }

        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(ConfigError::MissingKey(REQUIRED_KEYS[missing]));
        }
        Ok(config)
    }

    /// Uniform heading perturbation in `[-offset, +offset]`.
    pub fn random_angle_offset<R: Rng>(&self, rng: &mut R) -> f64 {
        let offset = self.max_random_angle_offset;
        if offset > 0.0 {
            rng.gen_range(-offset..=offset)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const POSITIONS: &str = "
        ROBOT_0_X -0.3
        ROBOT_0_Y 0.0
        ROBOT_0_ANGLE 0.0
        ROBOT_1_X 0.3 ROBOT_1_Y 0.0
        ROBOT_1_ANGLE 3.14159
        MAX_RANDOM_ANGLE_OFFSET 0.2
        END
        ROBOT_0_X garbage after end
    ";

    #[test]
    fn test_parse_positions() {
        let config = ArenaConfig::parse(POSITIONS).unwrap();
        assert_approx_eq!(config.start[0].x, -0.3);
        assert_approx_eq!(config.start[1].x, 0.3);
        assert_approx_eq!(config.start[1].angle, 3.14159);
        assert_approx_eq!(config.max_random_angle_offset, 0.2);
    }

    #[test]
    fn test_end_is_optional_and_offset_defaults_to_zero() {
        let text = "ROBOT_0_X 0 ROBOT_0_Y 0 ROBOT_0_ANGLE 0 ROBOT_1_X 1 ROBOT_1_Y 1 ROBOT_1_ANGLE 1";
        let config = ArenaConfig::parse(text).unwrap();
        assert_eq!(config.max_random_angle_offset, 0.0);
        assert_eq!(config.start[1], StartPose { x: 1.0, y: 1.0, angle: 1.0 });
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let text = "CAMERA 4 ROBOT_0_X 0 ROBOT_0_Y 0 ROBOT_0_ANGLE 0 ROBOT_1_X 1 ROBOT_1_Y 1 ROBOT_1_ANGLE 1 END";
        assert!(ArenaConfig::parse(text).is_ok());
    }

    #[test]
    fn test_missing_key() {
        let text = "ROBOT_0_X 0 ROBOT_0_Y 0 ROBOT_0_ANGLE 0 ROBOT_1_X 1 ROBOT_1_ANGLE 1 END";
        assert!(matches!(
            ArenaConfig::parse(text),
            Err(ConfigError::MissingKey("ROBOT_1_Y"))
        ));
        assert!(matches!(ArenaConfig::parse(""), Err(ConfigError::MissingKey("ROBOT_0_X"))));
    }

    #[test]
    fn test_bad_values() {
        let err = ArenaConfig::parse("ROBOT_0_X\n0.1\nROBOT_0_Y abc").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { line: 3, .. }));

        let err = ArenaConfig::parse("ROBOT_0_X 0.1 ROBOT_0_Y").unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { line: 1, .. }));

        let err = ArenaConfig::parse("ROBOT_0_X inf").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = ArenaConfig::parse("MAX_RANDOM_ANGLE_OFFSET -1").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAngleOffset(_)));
    }

    #[test]
    fn test_random_angle_offset_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = ArenaConfig {
            max_random_angle_offset: 0.5,
            ..Default::default()
        };
        for _ in 0..1000 {
            let offset = config.random_angle_offset(&mut rng);
            assert!((-0.5..=0.5).contains(&offset));
        }
        let still = ArenaConfig::default();
        assert_eq!(still.random_angle_offset(&mut rng), 0.0);
    }
}
