use serde::{Deserialize, Serialize};

/// Which optional features a box variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxStyle {
    /// Finger notch and rim chamfer.
    Standard,
    /// Standard plus divider slots and loose divider plates.
    Compartmented,
    /// Plain shell: no notch, no chamfer.
    Minimalist,
}

impl BoxStyle {
    pub fn has_finger_notch(self) -> bool {
        !matches!(self, BoxStyle::Minimalist)
    }

    pub fn has_rim_chamfer(self) -> bool {
        !matches!(self, BoxStyle::Minimalist)
    }

    pub fn has_dividers(self) -> bool {
        matches!(self, BoxStyle::Compartmented)
    }
}

/// Fully resolved physical description of one box. Lengths are millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxParams {
    pub slug: String,
    pub label: String,
    pub version: String,
    pub card_count: u32,
    pub card_width: f64,
    pub card_height: f64,
    pub card_thickness: f64,
    pub sleeve_allowance: f64,
    pub side_clearance: f64,
    pub stack_clearance: f64,
    pub top_clearance: f64,
    pub wall_thickness: f64,
    pub floor_thickness: f64,
    pub lid_clearance: f64,
    pub lid_skirt_depth: f64,
    pub corner_radius: f64,
    pub top_chamfer: f64,
    pub finger_notch_width: f64,
    pub finger_notch_depth: f64,
    pub divider_count: u32,
    pub style: BoxStyle,
}

impl BoxParams {
    /// The fixed base parameter set every catalog entry starts from:
    /// a single-sleeved standard card footprint.
    pub fn base() -> Self {
        Self {
            slug: String::new(),
            label: String::new(),
            version: "v1.0.0".to_string(),
            card_count: 100,
            card_width: 66.0,
            card_height: 91.0,
            card_thickness: 0.31,
            sleeve_allowance: 0.45,
            side_clearance: 1.5,
            stack_clearance: 2.0,
            top_clearance: 4.0,
            wall_thickness: 4.0,
            floor_thickness: 4.0,
            lid_clearance: 0.2,
            lid_skirt_depth: 20.0,
            corner_radius: 2.0,
            top_chamfer: 0.8,
            finger_notch_width: 20.0,
            finger_notch_depth: 12.0,
            divider_count: 0,
            style: BoxStyle::Standard,
        }
    }

    /// Thickness of one card in the stack, sleeve included.
    pub fn card_pitch(&self) -> f64 {
        self.card_thickness + self.sleeve_allowance
    }

    /// Check every parameter rule. The first violation wins.
    pub fn validate(&self) -> Result<(), Violation> {
        if self.slug.trim().is_empty() {
            return Err(Violation::new("slug", "must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(Violation::new("version", "must not be empty"));
        }
        if self.card_count == 0 {
            return Err(Violation::new("card_count", "must be greater than zero"));
        }

        let reals = [
            ("card_width", self.card_width),
            ("card_height", self.card_height),
            ("card_thickness", self.card_thickness),
            ("sleeve_allowance", self.sleeve_allowance),
            ("side_clearance", self.side_clearance),
            ("stack_clearance", self.stack_clearance),
            ("top_clearance", self.top_clearance),
            ("wall_thickness", self.wall_thickness),
            ("floor_thickness", self.floor_thickness),
            ("lid_clearance", self.lid_clearance),
            ("lid_skirt_depth", self.lid_skirt_depth),
            ("corner_radius", self.corner_radius),
            ("top_chamfer", self.top_chamfer),
            ("finger_notch_width", self.finger_notch_width),
            ("finger_notch_depth", self.finger_notch_depth),
        ];
        for (field, value) in reals {
            if !value.is_finite() {
                return Err(Violation::new(field, "must be finite"));
            }
        }

        for (field, value) in [
            ("card_width", self.card_width),
            ("card_height", self.card_height),
            ("card_thickness", self.card_thickness),
            ("wall_thickness", self.wall_thickness),
            ("floor_thickness", self.floor_thickness),
            ("lid_skirt_depth", self.lid_skirt_depth),
        ] {
            if value <= 0.0 {
                return Err(Violation::new(field, "must be greater than zero"));
            }
        }
        for (field, value) in [
            ("sleeve_allowance", self.sleeve_allowance),
            ("side_clearance", self.side_clearance),
            ("stack_clearance", self.stack_clearance),
            ("top_clearance", self.top_clearance),
            ("corner_radius", self.corner_radius),
            ("top_chamfer", self.top_chamfer),
        ] {
            if value < 0.0 {
                return Err(Violation::new(field, "must not be negative"));
            }
        }

        if self.lid_clearance <= 0.0 {
            return Err(Violation::new("lid_clearance", "must be greater than zero"));
        }
        if self.lid_clearance >= self.wall_thickness {
            return Err(Violation::new(
                "lid_clearance",
                "must be less than wall_thickness",
            ));
        }
        if self.corner_radius >= self.wall_thickness {
            return Err(Violation::new(
                "corner_radius",
                "must be less than wall_thickness",
            ));
        }
        if self.top_chamfer >= self.wall_thickness / 2.0 {
            return Err(Violation::new(
                "top_chamfer",
                "must be less than half of wall_thickness",
            ));
        }
        if self.style.has_finger_notch() {
            if self.finger_notch_width <= 0.0 {
                return Err(Violation::new(
                    "finger_notch_width",
                    "must be greater than zero for a notched style",
                ));
            }
            if self.finger_notch_depth <= 0.0 {
                return Err(Violation::new(
                    "finger_notch_depth",
                    "must be greater than zero for a notched style",
                ));
            }
        }

        if self.divider_count >= self.card_count {
            return Err(Violation::new(
                "divider_count",
                "must be less than card_count",
            ));
        }
        match (self.style.has_dividers(), self.divider_count) {
            (true, 0) => Err(Violation::new(
                "divider_count",
                "compartmented style needs at least one divider",
            )),
            (false, n) if n > 0 => Err(Violation::new(
                "divider_count",
                "dividers require the compartmented style",
            )),
            _ => Ok(()),
        }
    }
}

/// A broken parameter rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub rule: String,
}

impl Violation {
    fn new(field: &'static str, rule: &str) -> Self {
        Self {
            field,
            rule: rule.to_string(),
        }
    }
}

/// Named replacements for base parameters. Fields left `None` inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeve_allowance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_clearance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_clearance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_clearance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lid_clearance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lid_skirt_depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_chamfer: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finger_notch_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finger_notch_depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divider_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<BoxStyle>,
}

impl ParamOverrides {
    /// Replace each named field of `params` wholesale.
    pub fn apply_to(&self, params: &mut BoxParams) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        set(&mut params.card_count, &self.card_count);
        set(&mut params.card_width, &self.card_width);
        set(&mut params.card_height, &self.card_height);
        set(&mut params.card_thickness, &self.card_thickness);
        set(&mut params.sleeve_allowance, &self.sleeve_allowance);
        set(&mut params.side_clearance, &self.side_clearance);
        set(&mut params.stack_clearance, &self.stack_clearance);
        set(&mut params.top_clearance, &self.top_clearance);
        set(&mut params.wall_thickness, &self.wall_thickness);
        set(&mut params.floor_thickness, &self.floor_thickness);
        set(&mut params.lid_clearance, &self.lid_clearance);
        set(&mut params.lid_skirt_depth, &self.lid_skirt_depth);
        set(&mut params.corner_radius, &self.corner_radius);
        set(&mut params.top_chamfer, &self.top_chamfer);
        set(&mut params.finger_notch_width, &self.finger_notch_width);
        set(&mut params.finger_notch_depth, &self.finger_notch_depth);
        set(&mut params.divider_count, &self.divider_count);
        set(&mut params.style, &self.style);
    }
}
