use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewportParseError {
    #[error("Invalid viewport format: expected WIDTHxHEIGHT (e.g., 1200x900)")]
    InvalidFormat,
    #[error("Invalid width: {0}")]
    InvalidWidth(String),
    #[error("Invalid height: {0}")]
    InvalidHeight(String),
    #[error("Width must be positive")]
    ZeroWidth,
    #[error("Height must be positive")]
    ZeroHeight,
    #[error("Invalid breakpoint list: expected MOBILE,TABLET,DESKTOP (e.g., 375,768,1200)")]
    InvalidBreakpoints,
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            return Err(ViewportParseError::InvalidFormat);
        }

        let width: u32 = parts[0]
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(parts[0].to_string()))?;

        let height: u32 = parts[1]
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(parts[1].to_string()))?;

        if width == 0 {
            return Err(ViewportParseError::ZeroWidth);
        }
        if height == 0 {
            return Err(ViewportParseError::ZeroHeight);
        }

        Ok(Viewport { width, height })
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One of the three fixed capture widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub const fn all() -> [Breakpoint; 3] {
        [Breakpoint::Mobile, Breakpoint::Tablet, Breakpoint::Desktop]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel widths for each breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakpoints {
    pub mobile: u32,
    pub tablet: u32,
    pub desktop: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            mobile: 375,
            tablet: 768,
            desktop: 1200,
        }
    }
}

impl Breakpoints {
    pub fn width(&self, breakpoint: Breakpoint) -> u32 {
        match breakpoint {
            Breakpoint::Mobile => self.mobile,
            Breakpoint::Tablet => self.tablet,
            Breakpoint::Desktop => self.desktop,
        }
    }

    pub fn viewport(&self, breakpoint: Breakpoint, height: u32) -> Viewport {
        Viewport {
            width: self.width(breakpoint),
            height,
        }
    }

    /// Breakpoints in capture order (narrowest first).
    pub fn ordered(&self) -> [(Breakpoint, u32); 3] {
        Breakpoint::all().map(|bp| (bp, self.width(bp)))
    }

    pub fn is_ascending(&self) -> bool {
        self.mobile > 0 && self.mobile < self.tablet && self.tablet < self.desktop
    }
}

impl FromStr for Breakpoints {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let widths = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ViewportParseError::InvalidBreakpoints)?;
        match widths.as_slice() {
            [mobile, tablet, desktop] => {
                let parsed = Breakpoints {
                    mobile: *mobile,
                    tablet: *tablet,
                    desktop: *desktop,
                };
                if parsed.is_ascending() {
                    Ok(parsed)
                } else {
                    Err(ViewportParseError::InvalidBreakpoints)
                }
            }
            _ => Err(ViewportParseError::InvalidBreakpoints),
        }
    }
}
