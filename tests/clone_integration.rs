mod common;

use std::sync::{Arc, Mutex};

use common::{
    assets_with_title, fast_config, heading_and_paragraph, layout, raw, raw_text, three_card_row,
    tree, Script, ScriptedDriver,
};
use pcl_lib::browser::RawTree;
use pcl_lib::types::{VerifyStage, WidgetType};
use pcl_lib::{
    build_template, CloneRequest, CloneService, Config, NavigationPolicy, PageSnapshot, PclError,
    ProgressEvent, SnapshotCapturer, TemplateDocument, Verdict, WaitStrategy,
};
use tempfile::tempdir;

fn service(driver: &ScriptedDriver, config: Config) -> CloneService {
    CloneService::new(Arc::new(driver.clone()), config)
}

fn capturer(driver: &ScriptedDriver, config: &Config) -> SnapshotCapturer {
    SnapshotCapturer::new(
        Arc::new(driver.clone()),
        config.capture.clone(),
        NavigationPolicy::from_config(&config.browser, &config.capture),
    )
}

fn widget_types(doc: &TemplateDocument) -> Vec<WidgetType> {
    doc.widgets().map(|w| w.widget_type).collect()
}

#[tokio::test]
async fn heading_and_paragraph_become_one_section() {
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        ..Script::default()
    });

    let result = service(&driver, fast_config())
        .run(
            CloneRequest::new("https://example.com").skip_verification(true),
            None,
        )
        .await
        .expect("clone");

    let counts = result.template.counts();
    assert_eq!((counts.sections, counts.columns, counts.widgets), (1, 1, 2));
    assert_eq!(
        widget_types(&result.template),
        vec![WidgetType::Heading, WidgetType::Text]
    );
    assert_eq!(result.template.content[0].elements[0].size(), Some(100.0));
    assert_eq!(result.template.metadata.source_url, "https://example.com/");
}

#[tokio::test]
async fn flex_row_splits_into_rounded_columns() {
    let driver = ScriptedDriver::new(Script {
        tree: three_card_row(),
        ..Script::default()
    });

    let result = service(&driver, fast_config())
        .run(
            CloneRequest::new("https://example.com/cards").skip_verification(true),
            None,
        )
        .await
        .expect("clone");

    assert_eq!(result.template.content.len(), 1);
    let sizes: Vec<f64> = result.template.content[0]
        .elements
        .iter()
        .filter_map(|c| c.size())
        .collect();
    assert_eq!(sizes, vec![33.0, 33.0, 34.0]);
    assert_eq!(sizes.iter().sum::<f64>(), 100.0);
    assert_eq!(result.template.counts().widgets, 6);
}

#[tokio::test]
async fn navigation_falls_back_through_every_strategy() {
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        failing_strategies: vec![
            WaitStrategy::NetworkIdleStrict,
            WaitStrategy::NetworkIdleRelaxed,
        ],
        ..Script::default()
    });
    let config = fast_config();

    let snapshot = capturer(&driver, &config)
        .capture("https://example.com")
        .await
        .expect("dom-ready succeeds");

    assert_eq!(snapshot.captures.len(), 3);
    assert_eq!(
        driver.events_starting_with("navigate:"),
        vec![
            "navigate:network-idle-strict",
            "navigate:network-idle-relaxed",
            "navigate:dom-ready",
        ]
    );
    assert_eq!(
        driver.events_starting_with("viewport:"),
        vec!["viewport:375", "viewport:768", "viewport:1200"]
    );
    assert_eq!(driver.open_contexts(), 0);
}

#[tokio::test]
async fn exhausted_cascade_aborts_the_clone() {
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        failing_strategies: WaitStrategy::cascade().to_vec(),
        ..Script::default()
    });

    let err = service(&driver, fast_config())
        .run(CloneRequest::new("https://unreachable.example"), None)
        .await
        .expect_err("navigation fails");

    match err {
        PclError::Navigation { attempted, .. } => {
            assert_eq!(attempted, WaitStrategy::cascade().to_vec());
        }
        other => panic!("expected navigation error, got {other:?}"),
    }
    assert!(driver.events().contains(&"close".to_string()));
    assert_eq!(driver.open_contexts(), 0);
}

#[tokio::test]
async fn skipping_verification_opens_a_single_page() {
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        layout: layout(10),
        screenshot_bytes: Some(4096),
        ..Script::default()
    });

    let result = service(&driver, fast_config())
        .run(
            CloneRequest::new("https://example.com").skip_verification(true),
            None,
        )
        .await
        .expect("clone");

    assert_eq!(result.verdict, Verdict::Skipped);
    assert!(result.fidelity.is_none());
    assert!(result.template.metadata.fidelity_score.is_none());
    assert_eq!(driver.events_starting_with("open:").len(), 1);
    assert!(driver.events_starting_with("set-content").is_empty());
}

#[tokio::test]
async fn matching_clone_is_accepted() {
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        layout: layout(10),
        screenshot_bytes: Some(4096),
        ..Script::default()
    });

    let result = service(&driver, fast_config())
        .run(CloneRequest::new("https://example.com"), None)
        .await
        .expect("clone");

    assert_eq!(result.verdict, Verdict::Accepted);
    let report = result.fidelity.expect("fidelity report");
    assert!(report.passed);
    assert!(!report.is_fallback());
    assert_eq!(report.structural_score, 1.0);
    assert_eq!(report.responsive_score, 1.0);
    assert_eq!(report.visual_score, 0.8);
    assert!((report.fidelity_score - 0.94).abs() < 1e-9);
    assert_eq!(
        report.details.stages,
        vec![
            VerifyStage::Preparing,
            VerifyStage::CapturingOriginal,
            VerifyStage::RenderingClone,
            VerifyStage::ScoringVisual,
            VerifyStage::ScoringStructural,
            VerifyStage::ScoringResponsive,
            VerifyStage::Scored,
        ]
    );
    assert_eq!(report.details.breakpoints.len(), 3);
    assert!(report.screenshots.is_none());
    assert_eq!(result.template.metadata.fidelity_score, Some(report.fidelity_score));
    // scrape, original and clone
    assert_eq!(driver.events_starting_with("open:").len(), 3);
    assert_eq!(driver.open_contexts(), 0);
}

#[tokio::test]
async fn kept_artifacts_are_reported_and_left_on_disk() {
    let dir = tempdir().expect("tempdir");
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        layout: layout(10),
        screenshot_bytes: Some(2048),
        ..Script::default()
    });

    let result = service(&driver, fast_config())
        .with_artifacts(Some(dir.path().to_path_buf()), true)
        .run(CloneRequest::new("https://example.com"), None)
        .await
        .expect("clone");

    let shots = result
        .fidelity
        .and_then(|r| r.screenshots)
        .expect("screenshots are reported");
    assert_eq!(shots.len(), 6);
    let desktop = &shots["original-desktop"];
    assert_eq!(desktop.bytes, 2048);
    assert!(desktop.path.exists());
    assert!(dir.path().join("clone-mobile.png").exists());
}

#[tokio::test]
async fn unkept_artifacts_are_cleaned_up() {
    let dir = tempdir().expect("tempdir");
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        layout: layout(10),
        screenshot_bytes: Some(2048),
        ..Script::default()
    });

    let result = service(&driver, fast_config())
        .with_artifacts(Some(dir.path().to_path_buf()), false)
        .run(CloneRequest::new("https://example.com"), None)
        .await
        .expect("clone");

    assert!(result.fidelity.expect("report").screenshots.is_none());
    assert!(!dir.path().join("original-desktop.png").exists());
    assert!(!dir.path().join("clone-desktop.png").exists());
}

#[tokio::test]
async fn render_failure_falls_back_to_needs_review() {
    let driver = ScriptedDriver::new(Script {
        tree: heading_and_paragraph(),
        assets: assets_with_title("Demo"),
        layout: layout(10),
        fail_set_content: true,
        ..Script::default()
    });
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let result = service(&driver, fast_config())
        .run(
            CloneRequest::new("https://example.com"),
            Some(Arc::new(move |event: &ProgressEvent| {
                sink.lock().unwrap().push(event.progress);
            })),
        )
        .await
        .expect("verification failures never abort");

    let report = result.fidelity.expect("fallback report");
    let fallback = report.details.fallback.as_ref().expect("fallback info");
    assert_eq!(fallback.failed_stage, VerifyStage::RenderingClone);
    assert!(fallback.content_quality);
    assert!((report.fidelity_score - 0.21).abs() < 1e-9);
    assert!(!report.passed);
    match &result.verdict {
        Verdict::NeedsReview { reason, retry } => {
            assert!(reason.contains("page crashed"));
            assert!(retry.retryable);
            assert!(retry.skip_verification);
        }
        other => panic!("expected needs-review, got {other:?}"),
    }

    let progress = events.lock().unwrap().clone();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));
    assert_eq!(driver.open_contexts(), 0);
}

fn long_page(sections: usize) -> RawTree {
    let mut nodes = vec![raw("body", None)];
    for i in 0..sections {
        let section = nodes.len();
        nodes.push(raw("section", Some(0)));
        nodes.push(raw_text("h2", section, &format!("Section {i}")));
        nodes.push(raw_text("p", section, &"lorem ipsum dolor ".repeat(20)));
        let mut icon = raw("svg", Some(section));
        icon.outer_html = format!(
            "<svg>\n    <!-- icon {i} -->\n    <path d=\"M0 0\"/>\n    <path d=\"M1 1\"/>\n</svg>"
        );
        nodes.push(icon);
    }
    tree(nodes)
}

#[tokio::test]
async fn oversized_documents_compact_without_losing_structure() {
    let driver = ScriptedDriver::new(Script {
        tree: long_page(10),
        ..Script::default()
    });
    let mut config = fast_config();
    config.governance.field_limit = 1_000;
    config.governance.document_limit = 1_001;
    config.governance.keep_sections = 100;

    let result = service(&driver, config)
        .run(
            CloneRequest::new("https://example.com/long").skip_verification(true),
            None,
        )
        .await
        .expect("clone");

    let governance = &result.governance;
    assert!(governance.compacted);
    assert_eq!(governance.cleaned_fields, 0);
    assert_eq!(governance.truncated_sections, 0);
    assert!(governance.final_bytes < governance.original_bytes);

    let counts = result.template.counts();
    assert_eq!(counts.sections, 10);
    assert_eq!(counts.widgets, 30);
    let markup: Vec<&str> = result
        .template
        .widgets()
        .filter(|w| w.widget_type == WidgetType::Html)
        .filter_map(|w| w.settings["html"].as_str())
        .collect();
    assert_eq!(markup.len(), 10);
    assert!(markup.iter().all(|m| !m.contains("<!--")));
}

#[tokio::test]
async fn truncation_is_the_last_resort() {
    let driver = ScriptedDriver::new(Script {
        tree: long_page(10),
        ..Script::default()
    });
    let mut config = fast_config();
    config.governance.field_limit = 500;
    config.governance.document_limit = 4_000;
    config.governance.keep_sections = 3;

    let result = service(&driver, config)
        .run(
            CloneRequest::new("https://example.com/long").skip_verification(true),
            None,
        )
        .await
        .expect("clone");

    assert!(result.governance.compacted);
    assert_eq!(result.governance.truncated_sections, 7);
    assert_eq!(result.template.content.len(), 3);
    assert_eq!(result.template.metadata.sections_count, 3);
    assert!(result.governance.final_bytes < result.governance.original_bytes);
}

#[tokio::test]
async fn captured_snapshots_classify_the_same_every_time() {
    let driver = ScriptedDriver::new(Script {
        tree: three_card_row(),
        assets: assets_with_title("Cards"),
        ..Script::default()
    });
    let config = fast_config();
    let snapshot = capturer(&driver, &config)
        .capture("https://example.com/cards")
        .await
        .expect("capture");

    let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
    let restored: PageSnapshot = serde_json::from_str(&json).expect("parse snapshot");
    assert_eq!(restored, snapshot);

    let first = build_template(&snapshot, &config.classifier, &config.capture.breakpoints);
    let second = build_template(&restored, &config.classifier, &config.capture.breakpoints);
    assert_eq!(first.counts(), second.counts());
    assert_eq!(widget_types(&first), widget_types(&second));
    assert_eq!(first.title, "Cards");
}

#[tokio::test]
async fn governed_documents_survive_a_json_round_trip() {
    for (page, limit) in [(three_card_row(), 5_000_000), (long_page(6), 1_001)] {
        let driver = ScriptedDriver::new(Script {
            tree: page,
            assets: assets_with_title("Round trip"),
            ..Script::default()
        });
        let mut config = fast_config();
        config.governance.field_limit = 1_000;
        config.governance.document_limit = limit;
        config.governance.keep_sections = 100;

        let result = service(&driver, config)
            .run(
                CloneRequest::new("https://example.com/trip").skip_verification(true),
                None,
            )
            .await
            .expect("clone");
        assert_eq!(result.governance.compacted, limit == 1_001);

        let json = serde_json::to_string(&result.template).expect("serialize document");
        let restored: TemplateDocument = serde_json::from_str(&json).expect("parse document");
        assert_eq!(restored, result.template);
    }
}

#[tokio::test]
async fn repeated_capture_warnings_are_reported_once() {
    let mut page = heading_and_paragraph();
    page.warnings = vec!["stylesheet https://cdn.example.com/site.css is not readable".to_string()];
    let driver = ScriptedDriver::new(Script {
        tree: page,
        ..Script::default()
    });
    let config = fast_config();

    let snapshot = capturer(&driver, &config)
        .capture("https://example.com/")
        .await
        .expect("capture");

    assert_eq!(snapshot.captures.len(), 3);
    assert_eq!(
        snapshot.warnings,
        vec!["stylesheet https://cdn.example.com/site.css is not readable".to_string()]
    );
}
