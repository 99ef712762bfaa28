pub mod inspect;
pub mod run;
pub mod transforms;

use noisepipe_core::{TransformSpec, known_transforms};

/// Parse a transform name (plus the flags that carry its parameters) into a
/// spec. Unknown names list the registered transforms and exit.
pub fn parse_transform(name: &str, gain: f64) -> TransformSpec {
    match name {
        "identity" => TransformSpec::Identity,
        "negate" => TransformSpec::Negate,
        "amplify" => TransformSpec::Amplify { gain },
        "mix" => TransformSpec::Mix,
        _ => {
            eprintln!("Unknown transform '{name}'. Registered transforms:");
            for info in known_transforms() {
                eprintln!("  {}", info.name);
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_transform tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_identity() {
        assert_eq!(parse_transform("identity", 1.0), TransformSpec::Identity);
    }

    #[test]
    fn test_parse_negate() {
        assert_eq!(parse_transform("negate", 1.0), TransformSpec::Negate);
    }

    #[test]
    fn test_parse_amplify_carries_gain() {
        assert_eq!(
            parse_transform("amplify", 0.5),
            TransformSpec::Amplify { gain: 0.5 }
        );
    }

    #[test]
    fn test_parse_mix() {
        assert_eq!(parse_transform("mix", 1.0), TransformSpec::Mix);
    }

    #[test]
    fn test_every_registered_name_parses() {
        for info in known_transforms() {
            let spec = parse_transform(info.name, 1.0);
            assert_eq!(spec.name(), info.name);
        }
    }
}
