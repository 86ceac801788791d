//! Capture-area parsing and alignment.

use std::sync::OnceLock;

use regex::Regex;

use crate::device::Area;
use crate::errors::ChameliumError;

fn area_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<w>\d+)x(?P<h>\d+)(?:\+(?P<x>\d+)\+(?P<y>\d+))?$")
            .unwrap_or_else(|e| unreachable!("static area pattern: {e}"))
    })
}

/// Parse `WxH` or `WxH+X+Y`; the offset defaults to `+0+0`.
pub fn parse_area(text: &str) -> Result<Area, ChameliumError> {
    let invalid = || ChameliumError::usage(format!("'{text}' is not a valid area, expected WxH[+X+Y]"));
    let caps = area_pattern().captures(text.trim()).ok_or_else(invalid)?;

    let field = |name: &str| -> Result<u32, ChameliumError> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().map_err(|_| invalid()),
            None => Ok(0),
        }
    };

    Ok(Area {
        x: field("x")?,
        y: field("y")?,
        width: field("w")?,
        height: field("h")?,
    })
}

/// Round `value` up to the next multiple of `align`; `None` past `u32::MAX`.
pub fn align_up(value: u32, align: u32) -> Option<u32> {
    value.checked_next_multiple_of(align)
}

/// Round the area's width and height up to multiples of `align`.
///
/// The offset is left untouched; the capture engine only constrains the
/// frame dimensions.
pub fn round_area(area: Area, align: u32) -> Result<Area, ChameliumError> {
    let too_large = || {
        ChameliumError::usage(format!(
            "--area: {area} cannot be rounded up to a multiple of {align}"
        ))
    };
    Ok(Area {
        width: align_up(area.width, align).ok_or_else(too_large)?,
        height: align_up(area.height, align).ok_or_else(too_large)?,
        ..area
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_only() {
        let area = parse_area("1024x768").unwrap();
        assert_eq!(area, Area { x: 0, y: 0, width: 1024, height: 768 });
    }

    #[test]
    fn test_parse_with_offset() {
        let area = parse_area("640x480+16+32").unwrap();
        assert_eq!(area, Area { x: 16, y: 32, width: 640, height: 480 });
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "640", "640x", "x480", "640x480+16", "640x480+a+b", "-1x5", "640X480", "640x480junk"] {
            let err = parse_area(bad).unwrap_err();
            assert!(matches!(err, ChameliumError::Usage(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_area("99999999999x1").is_err());
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(101, 16), Some(112));
        assert_eq!(align_up(101, 8), Some(104));
        assert_eq!(align_up(112, 16), Some(112));
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(u32::MAX, 16), None);
    }

    #[test]
    fn test_round_area_is_smallest_aligned_cover() {
        for align in [8, 16] {
            for w in 1..=64 {
                let rounded = round_area(Area { x: 3, y: 5, width: w, height: w + 1 }, align).unwrap();
                assert_eq!(rounded.width % align, 0);
                assert_eq!(rounded.height % align, 0);
                assert!(rounded.width >= w && rounded.width - w < align);
                assert!(rounded.height > w && rounded.height - (w + 1) < align);
                assert_eq!((rounded.x, rounded.y), (3, 5));
                assert_eq!(round_area(rounded, align).unwrap(), rounded);
            }
        }
    }

    #[test]
    fn test_round_area_near_u32_max_is_usage_error() {
        let area = parse_area("4294967295x1").unwrap();
        let err = round_area(area, 16).unwrap_err();
        assert!(matches!(err, ChameliumError::Usage(_)));
        assert!(err.to_string().contains("multiple of 16"));

        let edge = parse_area("4294967280x1").unwrap();
        assert_eq!(round_area(edge, 16).unwrap().width, 4_294_967_280);
    }
}
