use std::fmt::Write as _;
use std::path::PathBuf;

use deckbox_engine::{changelog, BuiltBox, Extent};

fn extent(e: &Extent) -> String {
    format!("{:.2} x {:.2} x {:.2} mm", e.width, e.depth, e.height)
}

/// Human-readable report of one finished build.
pub fn render(built: &BuiltBox, files: &[PathBuf]) -> String {
    let p = &built.params;
    let d = &built.dims;
    let mut s = String::new();

    let _ = writeln!(s, "{} ({}, {})", p.label, p.slug, p.version);
    if let Some(note) = changelog(&p.version) {
        let _ = writeln!(s, "  changes:     {note}");
    }
    let _ = writeln!(s, "  cards:       {} at {:.3} mm", p.card_count, d.card_pitch);
    let _ = writeln!(s, "  inner:       {}", extent(&d.cavity));
    let _ = writeln!(s, "  outer:       {}", extent(&d.tray_outer));
    let _ = writeln!(
        s,
        "  wall/floor:  {:.2} / {:.2} mm",
        d.wall_thickness, d.floor_thickness
    );
    let _ = writeln!(s, "  lid outer:   {}", extent(&d.lid_outer));
    let _ = writeln!(s, "  lid inner:   {}", extent(&d.lid_inner));
    if d.compartments.len() > 1 {
        let split: Vec<String> = d
            .compartments
            .iter()
            .map(|c| format!("{} cards / {:.2} mm", c.cards, c.length))
            .collect();
        let _ = writeln!(s, "  compartments: {}", split.join(", "));
    }
    for solid in &built.solids {
        let _ = writeln!(s, "  {:<12} {:.1} mm3", solid.role.part_name(), solid.volume);
    }
    for file in files {
        let _ = writeln!(s, "  wrote {}", file.display());
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckbox_engine::{build, CancelToken, Registry};
    use deckbox_kernel::MockKernel;

    #[test]
    fn split_box_summary_lists_compartments() {
        let mut kernel = MockKernel::new();
        let built = build(
            &Registry::builtin(),
            "constructed_60_15_split",
            &mut kernel,
            &CancelToken::new(),
        )
        .unwrap();
        let text = render(&built, &[PathBuf::from("out/a.step")]);
        assert!(text.starts_with("Constructed 60 + Sideboard 15 (split)"));
        assert!(text.contains("compartments: 37 cards"));
        assert!(text.contains("divider_01"));
        assert!(text.contains("wrote out/a.step"));
    }

    #[test]
    fn single_compartment_box_omits_split() {
        let mut kernel = MockKernel::new();
        let built = build(
            &Registry::builtin(),
            "commander_100",
            &mut kernel,
            &CancelToken::new(),
        )
        .unwrap();
        let text = render(&built, &[]);
        assert!(!text.contains("compartments"));
        assert!(text.contains("changes:"));
    }
}
