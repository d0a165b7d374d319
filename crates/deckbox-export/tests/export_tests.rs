use deckbox_engine::{build, BuildError, BuiltBox, CancelToken, Registry};
use deckbox_export::*;
use deckbox_kernel::{KernelCall, MockKernel};
use deckbox_types::SolidRole;

fn build_mock(slug: &str) -> (MockKernel, BuiltBox) {
    let mut kernel = MockKernel::new();
    let built = build(&Registry::builtin(), slug, &mut kernel, &CancelToken::new()).unwrap();
    (kernel, built)
}

fn all_formats() -> Vec<ExportFormat> {
    vec![
        ExportFormat::Step,
        ExportFormat::StlBinary,
        ExportFormat::StlAscii,
    ]
}

fn names(artifacts: &[Artifact]) -> Vec<&str> {
    artifacts.iter().map(|a| a.file_name.as_str()).collect()
}

#[test]
fn commander_100_default_export_files() {
    let (mut kernel, built) = build_mock("commander_100");
    let options = BuildOptions::default();
    let artifacts = render(&mut kernel, &built, &options.formats, options.mesh_tolerance).unwrap();
    assert_eq!(
        names(&artifacts),
        vec![
            "commander_100_v1.0.0_assembly.step",
            "commander_100_v1.0.0_assembly.stl",
            "commander_100_v1.0.0_tray.stl",
            "commander_100_v1.0.0_lid.stl",
            "commander_100_v1.0.0_manifest.json",
        ]
    );
}

#[test]
fn step_holds_every_solid() {
    let (mut kernel, built) = build_mock("constructed_60_15_split");
    let artifacts = render(&mut kernel, &built, &[ExportFormat::Step], 0.1).unwrap();
    let step = String::from_utf8(artifacts[0].bytes.clone()).unwrap();
    assert!(step.starts_with("ISO-10303-21;"));
    assert_eq!(step.matches("MOCK_SOLID").count(), built.solids.len());
    assert!(built.solids.len() > 2);
    assert!(kernel
        .journal()
        .contains(&KernelCall::ExportStep { solids: built.solids.len() }));
}

#[test]
fn divider_parts_get_their_own_meshes() {
    let (mut kernel, built) = build_mock("constructed_60_15_split");
    let artifacts = render(&mut kernel, &built, &[ExportFormat::StlBinary], 0.1).unwrap();
    let files = names(&artifacts);
    for divider in built.dividers() {
        let expected = file_name(
            "constructed_60_15_split",
            &built.params.version,
            Part::Solid(divider.role),
            ExportFormat::StlBinary,
        );
        assert!(files.contains(&expected.as_str()), "missing {expected}");
    }
}

#[test]
fn binary_stl_triangle_count_matches_length() {
    let (mut kernel, built) = build_mock("uno_36");
    let artifacts = render(&mut kernel, &built, &[ExportFormat::StlBinary], 0.1).unwrap();
    for artifact in artifacts.iter().filter(|a| a.file_name.ends_with(".stl")) {
        let b = &artifact.bytes;
        let count = u32::from_le_bytes([b[80], b[81], b[82], b[83]]) as usize;
        assert!(count > 0);
        assert_eq!(b.len(), 84 + 50 * count, "{}", artifact.file_name);
    }
}

#[test]
fn ascii_and_binary_stl_coexist() {
    let (mut kernel, built) = build_mock("uno_36");
    let artifacts = render(&mut kernel, &built, &all_formats(), 0.1).unwrap();
    let files = names(&artifacts);
    assert!(files.contains(&"uno_36_v1.0.0_tray.stl"));
    assert!(files.contains(&"uno_36_v1.0.0_tray.ascii.stl"));
    let ascii = artifacts
        .iter()
        .find(|a| a.file_name == "uno_36_v1.0.0_tray.ascii.stl")
        .unwrap();
    let text = std::str::from_utf8(&ascii.bytes).unwrap();
    assert!(text.starts_with("solid uno_36_v1.0.0_tray\n"));
}

#[test]
fn duplicate_formats_render_once() {
    let (mut kernel, built) = build_mock("commander_100");
    let artifacts = render(
        &mut kernel,
        &built,
        &[ExportFormat::Step, ExportFormat::Step],
        0.1,
    )
    .unwrap();
    assert_eq!(artifacts.len(), 2);
}

#[test]
fn manifest_lists_files_and_volumes() {
    let (mut kernel, built) = build_mock("commander_100");
    let artifacts = render(&mut kernel, &built, &all_formats(), 0.1).unwrap();
    let last = artifacts.last().unwrap();
    assert_eq!(last.file_name, "commander_100_v1.0.0_manifest.json");

    let manifest: BuildManifest = serde_json::from_slice(&last.bytes).unwrap();
    assert_eq!(manifest.slug, "commander_100");
    assert_eq!(manifest.card_count, 100);
    assert!(manifest.changelog.is_some());
    assert_eq!(manifest.files.len(), artifacts.len() - 1);
    assert_eq!(manifest.dimensions, built.dims);
    let tray = built.solid(SolidRole::Tray).unwrap();
    assert_eq!(manifest.solids[0].part, "tray");
    assert_eq!(manifest.solids[0].volume, tray.volume);
}

#[test]
fn export_is_byte_identical_across_builds() {
    let (mut k1, b1) = build_mock("constructed_60_15");
    let (mut k2, b2) = build_mock("constructed_60_15");
    let a1 = render(&mut k1, &b1, &all_formats(), 0.1).unwrap();
    let a2 = render(&mut k2, &b2, &all_formats(), 0.1).unwrap();
    assert_eq!(a1, a2);
}

#[test]
fn corrupted_solid_fails_before_any_file() {
    let (mut kernel, built) = build_mock("commander_100");
    let lid = built.solid(SolidRole::Lid).unwrap();
    kernel.invalidate(&lid.handle);

    let err = render(&mut kernel, &built, &all_formats(), 0.1).unwrap_err();
    assert!(matches!(&err, ExportError::InvalidSolid { part, .. } if part == "lid"));
    assert!(!kernel
        .journal()
        .iter()
        .any(|c| matches!(c, KernelCall::ExportStep { .. } | KernelCall::Tessellate)));

    let dir = tempfile::tempdir().unwrap();
    let options = BuildOptions {
        out_dir: dir.path().join("out"),
        ..BuildOptions::default()
    };
    let err = export(&mut kernel, &built, &options).unwrap_err();
    assert!(matches!(err, BuildError::ExportFailure { ref slug, .. } if slug == "commander_100"));
    assert!(!options.out_dir.exists());
}

#[test]
fn export_writes_into_new_directory() {
    let (mut kernel, built) = build_mock("color_addicted_40");
    let dir = tempfile::tempdir().unwrap();
    let options = BuildOptions {
        formats: all_formats(),
        out_dir: dir.path().join("nested").join("out"),
        mesh_tolerance: DEFAULT_MESH_TOLERANCE,
    };
    let paths = export(&mut kernel, &built, &options).unwrap();
    assert!(!paths.is_empty());
    for path in &paths {
        assert!(path.starts_with(&options.out_dir));
        assert!(std::fs::metadata(path).unwrap().len() > 0);
    }
}

#[test]
fn unwritable_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let artifacts = vec![Artifact {
        file_name: "a.step".to_string(),
        bytes: b"data".to_vec(),
    }];
    let err = write(&artifacts, &blocker.join("sub")).unwrap_err();
    assert!(matches!(err, ExportError::Io { .. }));
}
