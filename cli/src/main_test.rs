#![allow(clippy::float_cmp)]

use std::io::Write;

use super::*;

fn pages(count: u32) -> PageArgs {
    PageArgs { pages: count, page_width: 612.0, page_height: 792.0, scale: 1.5 }
}

// =============================================================
// Argument parsing
// =============================================================

#[test]
fn project_select_splits_form_list() {
    let cli = Cli::try_parse_from([
        "permit-cli",
        "project",
        "select",
        "--city",
        "miami",
        "--forms",
        "roof,hvhz",
        "--job-zip",
        "33101",
    ])
    .unwrap();
    let Command::Project(ProjectCommand { command: ProjectSubcommand::Select(args) }) = cli.command else {
        panic!("expected project select");
    };
    assert_eq!(args.forms, vec!["roof".to_owned(), "hvhz".to_owned()]);
    assert_eq!(args.city.as_deref(), Some("miami"));
    assert_eq!(args.job_zip.as_deref(), Some("33101"));
}

#[test]
fn overlay_page_geometry_defaults_to_letter() {
    let cli = Cli::try_parse_from(["permit-cli", "overlay", "fields"]).unwrap();
    let Command::Overlay(overlay) = cli.command else {
        panic!("expected overlay");
    };
    assert_eq!(overlay.pages.pages, 1);
    assert_eq!((overlay.pages.page_width, overlay.pages.page_height), (612.0, 792.0));
    assert_eq!(overlay.pages.scale, permit_overlay::consts::DEFAULT_RENDER_SCALE);
}

// =============================================================
// FixedPages
// =============================================================

#[test]
fn fixed_pages_scale_every_page() {
    let mut raster = FixedPages::new(pages(3), &EditorConfig::default());
    assert_eq!(raster.page_count(), 3);
    let page = raster.rasterize(2).unwrap();
    assert_eq!((page.width, page.height, page.scale), (918.0, 1188.0, 1.5));
}

#[test]
fn fixed_pages_reject_out_of_range_pages() {
    let mut raster = FixedPages::new(pages(2), &EditorConfig::default());
    assert!(matches!(raster.rasterize(0), Err(EditorError::RenderTargetMissing(_))));
    assert!(matches!(raster.rasterize(3), Err(EditorError::RenderTargetMissing(_))));
}

#[test]
fn fixed_pages_never_report_zero_pages() {
    let raster = FixedPages::new(pages(0), &EditorConfig { render_scale: 0.0, ..EditorConfig::default() });
    assert_eq!(raster.page_count(), 1);
    assert_eq!(raster.scale, 1.0);
}

// =============================================================
// replace_layers
// =============================================================

#[test]
fn replace_layers_converts_document_space_file() {
    let mut core = EditorCore::default();
    core.viewport.open(&mut FixedPages::new(pages(1), &EditorConfig::default())).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"[{{"id":"a","type":"text","key":"custom.text","page":1,"x":100,"y":592}}]"#).unwrap();

    assert_eq!(replace_layers(&mut core, file.path()).unwrap(), 1);
    let layer = &core.layers()[0];
    assert_eq!((layer.x, layer.y), (150.0, 300.0));
}

#[test]
fn replace_layers_rejects_non_arrays() {
    let mut core = EditorCore::default();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"layers":[]}}"#).unwrap();

    assert!(matches!(replace_layers(&mut core, file.path()), Err(CliError::NotALayerArray(_))));
}

// =============================================================
// File names
// =============================================================

#[test]
fn blank_file_name_stays_one_component() {
    assert_eq!(blank_file_name(&DocumentContext::new("miami", "roof_permit")), "miami_roof_permit.pdf");
    assert_eq!(blank_file_name(&DocumentContext::new("miami/dade", "../hvhz")), "miami_dade__hvhz.pdf");
}
