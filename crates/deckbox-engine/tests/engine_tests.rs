use std::f64::consts::FRAC_PI_4;

use approx::assert_relative_eq;
use deckbox_engine::*;
use deckbox_kernel::{KernelCall, MockKernel};
use deckbox_types::SolidRole;
use proptest::prelude::*;

fn build_mock(slug: &str) -> (MockKernel, BuiltBox) {
    let mut kernel = MockKernel::new();
    let built = build(&Registry::builtin(), slug, &mut kernel, &CancelToken::new()).unwrap();
    (kernel, built)
}

fn phase_of(call: &KernelCall) -> Option<Phase> {
    match call {
        KernelCall::MakeFace { .. } | KernelCall::Extrude { .. } | KernelCall::Union => {
            Some(Phase::Additive)
        }
        KernelCall::Shell { .. } | KernelCall::Subtract => Some(Phase::Subtractive),
        KernelCall::Fillet { .. } | KernelCall::Chamfer { .. } => Some(Phase::Finishing),
        _ => None,
    }
}

// ── Scenarios ──────────────────────────────────────────────────────────────

#[test]
fn commander_100_builds_tray_and_lid() {
    let registry = Registry::builtin();
    let params = registry.resolve("commander_100").unwrap();
    assert_eq!(params.card_count, 100);
    assert_eq!(params.style, BoxStyle::Standard);
    assert_eq!(params.divider_count, 0);

    let dims = derive(&params).unwrap();
    assert!(dims.cavity.depth > params.card_thickness * 100.0);

    let (_, built) = build_mock("commander_100");
    let roles: Vec<SolidRole> = built.solids.iter().map(|s| s.role).collect();
    assert_eq!(roles, vec![SolidRole::Tray, SolidRole::Lid]);
    assert_eq!(built.catalog_version, BUILTIN_CATALOG_VERSION);
}

#[test]
fn commander_100_tray_volume_accounts_for_every_cut() {
    let (_, built) = build_mock("commander_100");
    let d = &built.dims;
    let o = d.tray_outer;
    let c = d.cavity;
    let notch = d.notch.unwrap();

    let expected = o.width * o.depth * o.height
        - c.width * c.depth * c.height
        - notch.width * d.wall_thickness * notch.depth
        - (2.0 * (c.width + c.depth) - notch.width) * d.rim_chamfer * d.rim_chamfer / 2.0
        - 4.0 * o.height * (1.0 - FRAC_PI_4) * d.corner_radius * d.corner_radius;
    let tray = built.solid(SolidRole::Tray).unwrap();
    assert_relative_eq!(tray.volume, expected, epsilon = 1e-6);
}

#[test]
fn rim_chamfer_stops_at_the_notch_and_slots() {
    let (kernel, built) = build_mock("constructed_60_15_split");
    let d = &built.dims;
    let c = d.cavity;
    let rim_length = 2.0 * (c.width + c.depth)
        - d.notch.map(|n| n.width).unwrap_or(0.0)
        - 2.0 * d.wall_thickness * d.slots.len() as f64;

    let chamfer_calls = kernel
        .journal()
        .iter()
        .filter(|call| matches!(call, KernelCall::Chamfer { .. }))
        .count();
    assert_eq!(chamfer_calls, 1);

    let tray = built.solid(SolidRole::Tray).unwrap();
    let shell_and_cuts = {
        let o = d.tray_outer;
        let mut v = o.width * o.depth * o.height - c.width * c.depth * c.height;
        if let Some(n) = d.notch {
            v -= n.width * d.wall_thickness * n.depth;
        }
        let groove_height = o.height - d.floor_thickness - planner::SLOT_LIFT;
        v -= d.slots.len() as f64 * 2.0 * d.slot_groove * d.wall_thickness * groove_height;
        v
    };
    let corners = 4.0 * d.tray_outer.height * (1.0 - FRAC_PI_4) * d.corner_radius.powi(2);
    let chamfer = rim_length * d.rim_chamfer.powi(2) / 2.0;
    assert_relative_eq!(tray.volume, shell_and_cuts - chamfer - corners, epsilon = 1e-6);
}

#[test]
fn lid_volume_is_skirt_plus_cap() {
    let (_, built) = build_mock("commander_100");
    let d = &built.dims;
    let (o, i) = (d.lid_outer, d.lid_inner);
    let r = d.lid_corner_radius;
    let expected = o.width * o.depth * o.height
        - i.width * i.depth * i.height
        - 4.0 * o.height * (1.0 - FRAC_PI_4) * r * r;
    let lid = built.solid(SolidRole::Lid).unwrap();
    assert_relative_eq!(lid.volume, expected, epsilon = 1e-6);
}

#[test]
fn split_model_builds_loose_dividers() {
    let (_, built) = build_mock("constructed_60_15_split");
    assert_eq!(built.solids.len(), 3);
    let dividers: Vec<_> = built.dividers().collect();
    assert_eq!(dividers.len(), 1);
    assert_eq!(dividers[0].role, SolidRole::Divider { index: 1 });

    let plate = built.dims.divider.unwrap();
    assert_relative_eq!(
        dividers[0].volume,
        plate.width * plate.depth * plate.height,
        epsilon = 1e-9
    );
    let cards: Vec<u32> = built.dims.compartments.iter().map(|c| c.cards).collect();
    assert_eq!(cards, vec![37, 38]);
}

#[test]
fn every_builtin_model_builds() {
    let registry = Registry::builtin();
    for slug in registry.slugs() {
        let mut kernel = MockKernel::new();
        let built = build(&registry, slug, &mut kernel, &CancelToken::new()).unwrap();
        assert!(built.solids.iter().all(|s| s.volume > 0.0), "{slug}");
    }
}

#[test]
fn divider_count_at_card_count_is_invalid_configuration() {
    let entry = ModelEntry {
        slug: "overfull".to_string(),
        label: "Overfull".to_string(),
        version: None,
        overrides: ParamOverrides {
            card_count: Some(4),
            divider_count: Some(4),
            style: Some(BoxStyle::Compartmented),
            ..Default::default()
        },
    };
    let err = Registry::from_entries(1, BoxParams::base(), vec![entry]).unwrap_err();
    match err {
        RegistryLoadError::Invalid(BuildError::InvalidConfiguration { slug, field, .. }) => {
            assert_eq!(slug, "overfull");
            assert_eq!(field, "divider_count");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn zero_wall_fails_at_resolution() {
    let entry = ModelEntry {
        slug: "paper".to_string(),
        label: "Paper".to_string(),
        version: None,
        overrides: ParamOverrides {
            wall_thickness: Some(0.0),
            ..Default::default()
        },
    };
    let err = Registry::from_entries(1, BoxParams::base(), vec![entry]).unwrap_err();
    assert!(matches!(
        err,
        RegistryLoadError::Invalid(BuildError::InvalidConfiguration { ref field, .. })
            if field == "wall_thickness"
    ));
}

#[test]
fn zero_wall_bypassing_the_registry_is_degenerate() {
    let params = BoxParams {
        slug: "paper".to_string(),
        label: "Paper".to_string(),
        wall_thickness: 0.0,
        ..BoxParams::base()
    };
    assert!(matches!(
        derive(&params),
        Err(BuildError::DegenerateGeometry { .. })
    ));
}

#[test]
fn unknown_slug_fails_before_kernel() {
    let mut kernel = MockKernel::new();
    let err = build(&Registry::builtin(), "nope", &mut kernel, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, BuildError::UnknownModel { .. }));
    assert_eq!(err.slug(), "nope");
    assert!(kernel.journal().is_empty());
}

#[test]
fn executed_kernel_calls_follow_phase_order() {
    let registry = Registry::builtin();
    for slug in registry.slugs() {
        let params = registry.resolve(slug).unwrap();
        let dims = derive(&params).unwrap();
        let plan = plan(&params, &dims).unwrap();
        for solid in plan.solids() {
            let mut kernel = MockKernel::new();
            execute_plan(&mut kernel, slug, solid).unwrap();
            let phases: Vec<Phase> = kernel.journal().iter().filter_map(phase_of).collect();
            assert!(
                phases.windows(2).all(|w| w[0] <= w[1]),
                "{slug} {}: {phases:?}",
                solid.role
            );
        }
    }
}

#[test]
fn repeated_builds_issue_identical_kernel_calls() {
    let (a, built_a) = build_mock("constructed_60_15_split");
    let (b, built_b) = build_mock("constructed_60_15_split");
    assert_eq!(a.journal(), b.journal());
    let va: Vec<f64> = built_a.solids.iter().map(|s| s.volume).collect();
    let vb: Vec<f64> = built_b.solids.iter().map(|s| s.volume).collect();
    assert_eq!(va, vb);
    assert_eq!(built_a.plan, built_b.plan);
}

#[test]
fn build_many_keeps_request_order() {
    let registry = Registry::builtin();
    let slugs = ["uno_36", "nope", "commander_100"];
    let results = build_many(&registry, &slugs, MockKernel::new, &CancelToken::new());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().built.params.slug, "uno_36");
    assert!(matches!(results[1], Err(BuildError::UnknownModel { .. })));
    assert_eq!(results[2].as_ref().unwrap().built.params.slug, "commander_100");
}

#[test]
fn build_many_honours_cancellation() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let results = build_many(
        &Registry::builtin(),
        &["commander_100", "uno_36"],
        MockKernel::new,
        &cancel,
    );
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(BuildError::Cancelled { .. }))));
}

#[test]
fn plan_dump_is_json() {
    let (_, built) = build_mock("commander_100");
    let json = serde_json::to_string_pretty(&built.plan).unwrap();
    assert!(json.contains("\"slug\": \"commander_100\""));
    assert!(json.contains("\"op\": \"shell\""));
}

// ── Properties ─────────────────────────────────────────────────────────────

prop_compose! {
    fn valid_params()(
        card_count in 1u32..400,
        divider_seed in 0u32..6,
        (card_width, card_height) in (40.0f64..90.0, 60.0f64..120.0),
        (card_thickness, sleeve_allowance) in (0.2f64..0.8, 0.0f64..0.6),
        wall in 1.0f64..6.0,
        clearance_frac in 0.02f64..0.3,
        (corner_frac, chamfer_frac) in (0.0f64..0.5, 0.0f64..0.45),
        skirt in 5.0f64..30.0,
        (notch_width, notch_depth) in (5.0f64..30.0, 1.0f64..80.0),
        minimalist in any::<bool>(),
    ) -> BoxParams {
        let divider_count = divider_seed.min(card_count - 1);
        let style = if divider_count > 0 {
            BoxStyle::Compartmented
        } else if minimalist {
            BoxStyle::Minimalist
        } else {
            BoxStyle::Standard
        };
        BoxParams {
            slug: "prop".to_string(),
            label: "Prop".to_string(),
            card_count,
            card_width,
            card_height,
            card_thickness,
            sleeve_allowance,
            wall_thickness: wall,
            floor_thickness: wall,
            lid_clearance: wall * clearance_frac,
            lid_skirt_depth: skirt,
            corner_radius: wall * corner_frac,
            top_chamfer: wall * chamfer_frac,
            finger_notch_width: notch_width,
            finger_notch_depth: notch_depth,
            divider_count,
            style,
            ..BoxParams::base()
        }
    }
}

fn all_positive(d: &DerivedDimensions) -> bool {
    let mut values = vec![
        d.card_pitch,
        d.cavity.width,
        d.cavity.depth,
        d.cavity.height,
        d.tray_outer.width,
        d.tray_outer.depth,
        d.tray_outer.height,
        d.lid_thickness,
        d.lid_inner.width,
        d.lid_inner.depth,
        d.lid_inner.height,
        d.lid_outer.width,
        d.lid_outer.depth,
        d.lid_outer.height,
        d.lid_bottom_z,
        d.slot_groove,
    ];
    if let Some(n) = d.notch {
        values.extend([n.width, n.depth]);
    }
    if let Some(p) = d.divider {
        values.extend([p.width, p.depth, p.height]);
    }
    values.extend(d.compartments.iter().map(|c| c.length));
    values.iter().all(|v| *v > 0.0 && v.is_finite())
}

proptest! {
    #[test]
    fn valid_params_derive_positive_dimensions(params in valid_params()) {
        prop_assert_eq!(params.validate(), Ok(()));
        let dims = derive(&params).unwrap();
        prop_assert!(all_positive(&dims));
        if let Some(notch) = dims.notch {
            prop_assert!(notch.depth <= dims.tray_outer.height / 2.0);
        }
    }

    #[test]
    fn derive_never_returns_a_non_positive_dimension(
        params in valid_params(),
        card_width in -5.0f64..20.0,
        skirt in 1.0f64..200.0,
    ) {
        let params = BoxParams { card_width, lid_skirt_depth: skirt, ..params };
        match derive(&params) {
            Ok(dims) => prop_assert!(all_positive(&dims)),
            Err(BuildError::DegenerateGeometry { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn partition_covers_every_card(n in 1u32..1000, d in 0u32..20) {
        prop_assume!(d < n);
        let parts = partition_cards(n, d).unwrap();
        prop_assert_eq!(parts.len() as u32, d + 1);
        prop_assert_eq!(parts.iter().sum::<u32>(), n);
        let share = n / (d + 1);
        prop_assert!(parts[..parts.len() - 1].iter().all(|c| *c == share));
        prop_assert_eq!(parts[parts.len() - 1], share + n % (d + 1));
    }

    #[test]
    fn plans_respect_phase_order(params in valid_params()) {
        let dims = derive(&params).unwrap();
        let plan = plan(&params, &dims).unwrap();
        prop_assert_eq!(plan.dividers.len() as u32, params.divider_count);
        for solid in plan.solids() {
            prop_assert_eq!(solid.validate(), Ok(()));
            let phases: Vec<Phase> = solid.ops.iter().map(ConstructionOp::phase).collect();
            prop_assert!(phases.windows(2).all(|w| w[0] <= w[1]));
            if let (Some(add), Some(sub)) = (
                solid.last_index_of(Phase::Additive),
                solid.first_index_of(Phase::Subtractive),
            ) {
                prop_assert!(add < sub);
            }
        }
    }

    #[test]
    fn resolution_is_idempotent(
        card_count in 1u32..300,
        wall in 1.5f64..6.0,
        minimalist in any::<bool>(),
    ) {
        let entry = ModelEntry {
            slug: "p".to_string(),
            label: "P".to_string(),
            version: None,
            overrides: ParamOverrides {
                card_count: Some(card_count),
                wall_thickness: Some(wall),
                floor_thickness: Some(wall),
                corner_radius: Some(wall / 4.0),
                top_chamfer: Some(wall / 4.0),
                style: minimalist.then_some(BoxStyle::Minimalist),
                ..Default::default()
            },
        };
        let registry = Registry::from_entries(1, BoxParams::base(), vec![entry]).unwrap();
        let a = registry.resolve("p").unwrap();
        let b = registry.resolve("p").unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn random_models_build_on_mock(params in valid_params()) {
        let dims = derive(&params).unwrap();
        let plan = plan(&params, &dims).unwrap();
        let mut kernel = MockKernel::new();
        for solid in plan.solids() {
            let executed = execute_plan(&mut kernel, &params.slug, solid).unwrap();
            prop_assert!(executed.volume > 0.0);
        }
    }
}
