//! Push deploy workflow tests

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use jeeves::deploy::command::ShellCommand;
use jeeves::deploy::workflow::{DeployOptions, DeployOutcome, PushDeployer};
use jeeves::filesys::dir::Dir;
use jeeves::models::status::{CommitState, DESCRIPTION_MAX_LEN};

use common::{
    commands, error, pending, push_event, statuses, success, timeline, Entry, StubReporter,
    StubRunner, Timeline,
};

struct Fixture {
    root: Dir,
    timeline: Timeline,
    reporter: Arc<StubReporter>,
    deployer: PushDeployer,
}

impl Fixture {
    async fn new(runner: impl FnOnce(Timeline) -> StubRunner, install_dir: &[&str]) -> Self {
        Self::with_reporter(runner, StubReporter::new, install_dir).await
    }

    async fn with_reporter(
        runner: impl FnOnce(Timeline) -> StubRunner,
        reporter: impl FnOnce(Timeline) -> StubReporter,
        install_dir: &[&str],
    ) -> Self {
        let root = Dir::create_temp_dir("jeeves-workflow").await.unwrap();
        let timeline = timeline();
        let reporter = Arc::new(reporter(timeline.clone()));

        let install = install_dir
            .iter()
            .fold(root.clone(), |dir, segment| dir.subdir(segment));
        let options = DeployOptions::new(root.clone(), install);

        let deployer = PushDeployer::new(
            options,
            Arc::new(runner(timeline.clone())),
            reporter.clone(),
        );

        Self {
            root,
            timeline,
            reporter,
            deployer,
        }
    }

    async fn checkout(&self, owner: &str, name: &str) -> PathBuf {
        let dir = self.root.subdir(owner).subdir(name);
        dir.create().await.unwrap();
        dir.path().to_path_buf()
    }

    async fn cleanup(self) {
        self.root.delete().await.unwrap();
    }
}

fn command_lines(timeline: &Timeline) -> Vec<String> {
    commands(timeline).into_iter().map(|(command, _)| command).collect()
}

#[tokio::test]
async fn test_push_without_local_checkout_is_ignored() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    assert_eq!(outcome, DeployOutcome::Skipped);
    assert!(fixture.timeline.lock().unwrap().is_empty());
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_push_with_unusable_repository_name_is_ignored() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "..", "main", "abc123"))
        .await;

    assert_eq!(outcome, DeployOutcome::Skipped);
    assert!(fixture.timeline.lock().unwrap().is_empty());
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_deploy_other_repository() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;
    let target = fixture.checkout("acme", "widgets").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    assert_eq!(outcome, DeployOutcome::Deployed);
    assert_eq!(
        statuses(&fixture.timeline),
        vec![
            pending("checking out code"),
            pending("installing packages"),
            pending("restarting"),
            success("restarted"),
            success("deployed"),
        ]
    );
    assert_eq!(
        commands(&fixture.timeline),
        vec![
            ("git checkout main --".to_string(), target.clone()),
            ("git pull".to_string(), target.clone()),
            ("git checkout abc123 --".to_string(), target.clone()),
            ("./script/setup".to_string(), target.clone()),
            ("./script/restart".to_string(), target.clone()),
        ]
    );

    // Every status lands on the pushed commit
    for commit in fixture.reporter.commits() {
        assert_eq!(commit.owner, "acme");
        assert_eq!(commit.repo, "widgets");
        assert_eq!(commit.sha, "abc123");
        assert_eq!(commit.installation_id, Some(1));
    }
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_statuses_interleave_with_stages() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;
    let target = fixture.checkout("acme", "widgets").await;

    fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    let command = |line: &str| Entry::Command(line.to_string(), target.clone());
    let status = |(state, description): (_, String)| Entry::Status(state, description);
    assert_eq!(
        *fixture.timeline.lock().unwrap(),
        vec![
            status(pending("checking out code")),
            command("git checkout main --"),
            command("git pull"),
            command("git checkout abc123 --"),
            status(pending("installing packages")),
            command("./script/setup"),
            status(pending("restarting")),
            command("./script/restart"),
            status(success("restarted")),
            status(success("deployed")),
        ]
    );
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_deploy_self_reports_success_before_restart() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;
    let target = fixture.checkout("acme", "jeeves").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "jeeves", "main", "abc123"))
        .await;

    assert_eq!(outcome, DeployOutcome::Deployed);
    assert_eq!(
        statuses(&fixture.timeline),
        vec![
            pending("checking out code"),
            pending("installing packages"),
            success("restarting self"),
            success("deployed"),
        ]
    );

    let entries = fixture.timeline.lock().unwrap().clone();
    let tail = &entries[entries.len() - 3..];
    assert_eq!(
        tail,
        &[
            Entry::Status(CommitState::Success, "restarting self".to_string()),
            Entry::Command("./script/restart".to_string(), target),
            Entry::Status(CommitState::Success, "deployed".to_string()),
        ]
    );
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_self_detection_only_changes_statuses() {
    let other = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;
    other.checkout("acme", "widgets").await;
    other
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    let own = Fixture::new(StubRunner::new, &["acme", "widgets"]).await;
    own.checkout("acme", "widgets").await;
    own.deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    assert_eq!(command_lines(&other.timeline), command_lines(&own.timeline));
    assert_ne!(statuses(&other.timeline), statuses(&own.timeline));

    other.cleanup().await;
    own.cleanup().await;
}

#[tokio::test]
async fn test_install_failure_stops_deploy() {
    let fixture = Fixture::new(
        |t| StubRunner::new(t).failing("./script/setup", "disk full"),
        &["acme", "jeeves"],
    )
    .await;
    fixture.checkout("acme", "widgets").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    assert_eq!(outcome, DeployOutcome::Failed("disk full".to_string()));
    assert_eq!(
        statuses(&fixture.timeline),
        vec![
            pending("checking out code"),
            pending("installing packages"),
            error("disk full"),
        ]
    );
    assert!(!command_lines(&fixture.timeline).contains(&"./script/restart".to_string()));
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_checkout_failure_stops_remaining_git_commands() {
    let fixture = Fixture::new(
        |t| StubRunner::new(t).failing("git pull", "Command failed: git pull (exit status: 1)"),
        &["acme", "jeeves"],
    )
    .await;
    fixture.checkout("acme", "widgets").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    assert!(matches!(outcome, DeployOutcome::Failed(_)));
    assert_eq!(
        command_lines(&fixture.timeline),
        vec!["git checkout main --".to_string(), "git pull".to_string()]
    );
    assert_eq!(
        statuses(&fixture.timeline),
        vec![
            pending("checking out code"),
            error("Command failed: git pull (exit status: 1)"),
        ]
    );
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_restart_failure_reports_single_error() {
    let fixture = Fixture::new(
        |t| StubRunner::new(t).failing("./script/restart", "service refused to start"),
        &["acme", "jeeves"],
    )
    .await;
    fixture.checkout("acme", "widgets").await;

    fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    let trail = statuses(&fixture.timeline);
    assert_eq!(
        trail,
        vec![
            pending("checking out code"),
            pending("installing packages"),
            pending("restarting"),
            error("service refused to start"),
        ]
    );
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_long_error_is_truncated() {
    let message = "npm ERR! ".repeat(40);
    let fixture = Fixture::new(
        |t| StubRunner::new(t).failing("./script/setup", &message),
        &["acme", "jeeves"],
    )
    .await;
    fixture.checkout("acme", "widgets").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    // The outcome keeps the full message, only the status is cut
    assert_eq!(outcome, DeployOutcome::Failed(message.clone()));
    let trail = statuses(&fixture.timeline);
    let (state, description) = trail.last().unwrap();
    assert_eq!(*state, CommitState::Error);
    assert_eq!(description.len(), DESCRIPTION_MAX_LEN);
    assert_eq!(description, &message[..DESCRIPTION_MAX_LEN]);
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_unsafe_sha_fails_checkout_before_git_runs() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;
    fixture.checkout("acme", "widgets").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "--orphan"))
        .await;

    assert!(matches!(outcome, DeployOutcome::Failed(_)));
    assert!(commands(&fixture.timeline).is_empty());
    let trail = statuses(&fixture.timeline);
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0], pending("checking out code"));
    assert_eq!(trail[1].0, CommitState::Error);
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_status_failures_do_not_abort_deploy() {
    let fixture = Fixture::with_reporter(
        StubRunner::new,
        |t| StubReporter::new(t).failing(),
        &["acme", "jeeves"],
    )
    .await;
    fixture.checkout("acme", "widgets").await;

    let outcome = fixture
        .deployer
        .handle_push(&push_event("acme", "widgets", "main", "abc123"))
        .await;

    assert_eq!(outcome, DeployOutcome::Deployed);
    assert_eq!(command_lines(&fixture.timeline).len(), 5);
    assert_eq!(statuses(&fixture.timeline).len(), 5);
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_redeploying_same_sha_repeats_same_trail() {
    let fixture = Fixture::new(StubRunner::new, &["acme", "jeeves"]).await;
    fixture.checkout("acme", "widgets").await;
    let event = push_event("acme", "widgets", "main", "abc123");

    assert_eq!(fixture.deployer.handle_push(&event).await, DeployOutcome::Deployed);
    let first = fixture.timeline.lock().unwrap().clone();

    assert_eq!(fixture.deployer.handle_push(&event).await, DeployOutcome::Deployed);
    let both = fixture.timeline.lock().unwrap().clone();

    assert_eq!(both.len(), first.len() * 2);
    assert_eq!(&both[first.len()..], first.as_slice());
    fixture.cleanup().await;
}

#[tokio::test]
async fn test_configured_scripts_are_used() {
    let root = Dir::create_temp_dir("jeeves-workflow").await.unwrap();
    let target = root.subdir("acme").subdir("widgets");
    target.create().await.unwrap();
    let timeline = timeline();

    let mut options = DeployOptions::new(root.clone(), root.subdir("self"));
    options.setup_command = ShellCommand::parse("make install").unwrap();
    options.restart_command = ShellCommand::parse("systemctl --user restart widgets").unwrap();
    let deployer = PushDeployer::new(
        options,
        Arc::new(StubRunner::new(timeline.clone())),
        Arc::new(StubReporter::new(timeline.clone())),
    );

    deployer
        .handle_push(&push_event("acme", "widgets", "trunk", "def456"))
        .await;

    assert_eq!(
        command_lines(&timeline),
        vec![
            "git checkout trunk --".to_string(),
            "git pull".to_string(),
            "git checkout def456 --".to_string(),
            "make install".to_string(),
            "systemctl --user restart widgets".to_string(),
        ]
    );
    root.delete().await.unwrap();
}
