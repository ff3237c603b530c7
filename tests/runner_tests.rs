mod common;

use std::sync::Arc;

use common::*;
use storefront_actions::engine::ManualClock;
use storefront_actions::instruction::{Action, RuleParser};
use storefront_actions::{ActionStatus, StorefrontProfile, TestRunner, TestStatus};

fn runner_with(settings: storefront_actions::Settings) -> TestRunner {
    TestRunner::new(
        Box::new(RuleParser::new()),
        StorefrontProfile::default(),
        settings,
    )
}

#[tokio::test]
async fn test_passing_run_from_instruction() {
    let dir = create_test_dir();
    let page = FakePage::new().with_text("body", "Welcome to the store");
    let runner = runner_with(test_settings(dir.path()));

    let report = runner
        .execute_test(&page, "Go to the homepage. Verify the page contains 'Welcome'.")
        .await;

    assert_eq!(report.status, TestStatus::Passed);
    assert!(report.passed);
    assert_eq!(report.actions_executed.len(), 2);
    assert!(report.errors.is_empty());
    assert!(report.screenshots.is_empty());
    assert!(page
        .ops()
        .contains(&"navigate https://store.test".to_string()));
}

#[tokio::test]
async fn test_failed_action_continues_and_attaches_evidence() {
    let dir = create_test_dir();
    let page = FakePage::new().with_text("body", "Welcome");
    let runner = runner_with(test_settings(dir.path()));

    let actions = vec![
        Action::Navigate {
            url: "homepage".into(),
        },
        Action::Search {
            term: "laptop".into(),
        },
        Action::VerifyText {
            selector: "body".into(),
            text: "Welcome".into(),
        },
    ];
    let report = runner.execute_actions(&page, &actions).await;

    assert_eq!(report.status, TestStatus::Failed);
    assert!(!report.passed);
    assert_eq!(report.actions_executed.len(), 3);
    assert_eq!(report.actions_executed[0].status, ActionStatus::Success);
    assert_eq!(report.actions_executed[1].status, ActionStatus::Error);
    assert_eq!(report.actions_executed[2].status, ActionStatus::Success);

    assert_eq!(report.errors.len(), 1);
    assert!(
        report.errors[0].starts_with("Action failed: Search for laptop - Element not found:"),
        "{}",
        report.errors[0]
    );

    // The failed step gets an evidence screenshot, numbered by position.
    let evidence = report.actions_executed[1]
        .screenshot
        .clone()
        .expect("evidence screenshot");
    assert!(evidence.exists());
    let file_name = evidence.file_name().unwrap().to_str().unwrap().to_string();
    assert!(file_name.starts_with("error_step_2_"), "{file_name}");
    assert_eq!(report.screenshots, vec![evidence]);
}

#[tokio::test]
async fn test_stop_on_failure_skips_remaining_actions() {
    let dir = create_test_dir();
    let page = FakePage::new();
    let runner = runner_with(test_settings(dir.path())).with_stop_on_failure(true);

    let actions = vec![
        Action::Search {
            term: "laptop".into(),
        },
        Action::Screenshot { name: None },
    ];
    let report = runner.execute_actions(&page, &actions).await;

    assert_eq!(report.status, TestStatus::Failed);
    assert_eq!(report.actions_executed.len(), 1);
    // The screenshot action never ran; the only capture is the evidence shot.
    assert_eq!(
        page.ops().iter().filter(|op| *op == "screenshot").count(),
        1
    );
}

#[tokio::test]
async fn test_fatal_error_aborts_with_error_status() {
    let dir = create_test_dir();
    let page = FakePage::new()
        .with_text("body", "Welcome")
        .with_fatal(r#"input[type="search"]"#);
    let runner = runner_with(test_settings(dir.path()));

    let actions = vec![
        Action::VerifyText {
            selector: "body".into(),
            text: "Welcome".into(),
        },
        Action::Search {
            term: "laptop".into(),
        },
        Action::Checkout,
    ];
    let report = runner.execute_actions(&page, &actions).await;

    assert_eq!(report.status, TestStatus::Error);
    assert!(!report.passed);
    // The first outcome is kept; the rest never ran.
    assert_eq!(report.actions_executed.len(), 1);
    assert_eq!(report.actions_executed[0].status, ActionStatus::Success);
    assert_eq!(
        report.errors,
        vec!["Test execution error: Driver disconnected".to_string()]
    );
}

#[tokio::test]
async fn test_unparseable_instruction_reports_no_actions() {
    let dir = create_test_dir();
    let page = FakePage::new();
    let runner = runner_with(test_settings(dir.path()));

    let report = runner
        .execute_test(&page, "Lorem ipsum dolor sit amet")
        .await;

    assert_eq!(report.status, TestStatus::Failed);
    assert!(!report.passed);
    assert!(report.actions_executed.is_empty());
    assert_eq!(report.duration_ms, 0);
    assert_eq!(
        report.errors,
        vec!["No actions could be parsed from instruction".to_string()]
    );
    assert!(page.ops().is_empty());
}

#[tokio::test]
async fn test_screenshot_trouble_does_not_fail_the_run() {
    let dir = create_test_dir();
    let page = FakePage::new().with_screenshot_failures(2);
    let runner = runner_with(test_settings(dir.path()));

    let actions = vec![Action::Screenshot {
        name: Some("cart".into()),
    }];
    let report = runner.execute_actions(&page, &actions).await;

    assert_eq!(report.status, TestStatus::Passed);
    assert!(report.passed);
    assert!(report.errors.is_empty());
    let outcome = &report.actions_executed[0];
    assert_eq!(outcome.status, ActionStatus::Success);
    assert!(outcome
        .detail
        .as_deref()
        .unwrap()
        .starts_with("Screenshot capture failed"));
    assert_eq!(report.screenshots.len(), 1);
}

#[tokio::test]
async fn test_duration_counts_execution_only() {
    let dir = create_test_dir();
    let clock = Arc::new(ManualClock::new());
    let page = FakePage::new()
        .with_text("body", "Welcome")
        .with_clock(clock.clone(), 10);
    let runner = runner_with(test_settings(dir.path())).with_clock(clock);

    let report = runner
        .execute_test(&page, "Go to homepage. Verify the page contains 'Welcome'.")
        .await;

    assert_eq!(report.status, TestStatus::Passed);
    // navigate + query + text content, each advancing the clock 10ms.
    assert_eq!(report.duration_ms, 30);
}

#[tokio::test]
async fn test_runs_serialize_on_the_shared_page() {
    let dir = create_test_dir();
    let page = FakePage::new();
    let runner = Arc::new(runner_with(test_settings(dir.path())));

    let a = {
        let runner = Arc::clone(&runner);
        let page = page.clone();
        tokio::spawn(async move {
            runner
                .execute_actions(
                    &page,
                    &[Action::Navigate {
                        url: "homepage".into(),
                    }],
                )
                .await
        })
    };
    let b = {
        let runner = Arc::clone(&runner);
        let page = page.clone();
        tokio::spawn(async move {
            runner
                .execute_actions(
                    &page,
                    &[Action::Navigate {
                        url: "https://store.test/sale".into(),
                    }],
                )
                .await
        })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert!(a.passed);
    assert!(b.passed);
    assert_eq!(page.ops().len(), 2);
}
