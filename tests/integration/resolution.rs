use stackhub_cli::core::{Diagnostics, HubError};
use stackhub_cli::parameters::{
    CapturedOutput, Expander, Key, LockedParameters, Parameter, ParameterLocker,
    RequestedOutput, TeraEvaluator, expand_parameters, expand_requested_outputs,
    flatten_parameters,
};
use stackhub_cli::state::StackState;
use stackhub_cli::storage::FileKind;
use stackhub_cli::test_utils::{StorageFixture, init_test_logging, sample_parameters};

fn no_ask(_: &mut Parameter) -> anyhow::Result<()> {
    Ok(())
}

fn lock_sample(expander: &Expander<'_>, diags: &mut Diagnostics) -> LockedParameters {
    let mut parameters = flatten_parameters(&sample_parameters());
    ParameterLocker::new(expander)
        .with_environment(|name| (name == "HUB_TEST_DB_PASSWORD").then(|| "s3cret".to_string()))
        .lock(&mut parameters, &LockedParameters::new(), &mut no_ask, diags)
}

fn value<'a>(locked: &'a LockedParameters, key: &str) -> Option<&'a str> {
    locked.get(&Key::parse(key)).map(|p| p.value.as_str())
}

/// Lock the sample stack, deploy two components, expand stack outputs and
/// persist the whole state.
#[tokio::test]
async fn test_stack_run_end_to_end() {
    init_test_logging(None);
    let evaluator = TeraEvaluator::new();
    let expander = Expander::new(&evaluator);
    let mut diags = Diagnostics::new();

    let locked = lock_sample(&expander, &mut diags);
    diags.escalate(false).unwrap();

    assert_eq!(value(&locked, "password"), Some("s3cret"));
    assert_eq!(value(&locked, "ingress.host"), Some("app.example.com"));
    assert_eq!(value(&locked, "kubeconfig"), Some("${kube:config}"));
    assert_eq!(value(&locked, "size|postgres"), Some("db.t3.medium"));

    let mut state = StackState::new(locked.clone());

    let postgres = expand_parameters(
        "postgres",
        &[],
        &[
            Parameter::new("size", ""),
            Parameter::new("name", "#{hub.componentName | upper}"),
        ],
        &state.locked_parameters,
        &state.outputs,
        &expander,
        &mut diags,
    );
    diags.escalate(false).unwrap();
    assert_eq!(postgres[0].value, "db.t3.medium");
    assert_eq!(postgres[1].value, "POSTGRES");

    state.record_component(
        "postgres",
        vec![
            CapturedOutput::new("postgres", "endpoint", "pg.us-east-1.internal"),
            CapturedOutput::new("postgres", "port", "5432"),
        ],
        &mut diags,
    );

    let deps = vec!["postgres".to_string()];
    let app = expand_parameters(
        "app",
        &deps,
        &[
            Parameter::new("database.url", "postgres://${endpoint}:${port}/app"),
            Parameter::new("public.port", "#{ingress.port + 1}"),
            Parameter::new("size", ""),
        ],
        &state.locked_parameters,
        &state.outputs,
        &expander,
        &mut diags,
    );
    diags.escalate(false).unwrap();
    assert_eq!(app[0].value, "postgres://pg.us-east-1.internal:5432/app");
    assert_eq!(app[1].value, "444");
    assert_eq!(app[2].value, "db.t3.medium", "dependency parameters are visible");

    state.record_component("app", vec![CapturedOutput::new("app", "url", "https://app.example.com")], &mut diags);

    let requested = vec![
        RequestedOutput::new("app:url", ""),
        RequestedOutput::new("db", "${postgres:endpoint}:${postgres:port}"),
        RequestedOutput::new("region", "${cloud.region}"),
        RequestedOutput::new("note", "literal"),
    ];
    state.stack_outputs =
        expand_requested_outputs(&state.locked_parameters, &state.outputs, &requested, true, &mut diags)
            .unwrap();
    let outputs: Vec<_> =
        state.stack_outputs.iter().map(|o| (o.name.as_str(), o.value.as_str())).collect();
    assert_eq!(
        outputs,
        vec![
            ("url", "https://app.example.com"),
            ("db", "pg.us-east-1.internal:5432"),
            ("region", "us-east-1"),
            ("note", "literal"),
        ]
    );

    let fixture = StorageFixture::new();
    let session = fixture.session();
    let locations = vec![fixture.local("hub.state"), "s3://states/dev/hub.state".to_string()];
    let file = session.check(&locations, FileKind::State, &mut diags).await.unwrap();
    state.save(&session, &file, &mut diags).await.unwrap();

    let file = session.check(&locations, FileKind::State, &mut diags).await.unwrap();
    let loaded = StackState::load(&session, &file).await.unwrap().unwrap();
    assert_eq!(loaded, state);
    assert_eq!(loaded.components, vec!["postgres", "app"]);
    assert!(!diags.has_errors());
}

/// A component parameter with nothing to resolve to fails the batch unless forced.
#[test]
fn test_unresolved_component_parameter_escalation() {
    let evaluator = TeraEvaluator::new();
    let expander = Expander::new(&evaluator);
    let mut diags = Diagnostics::new();
    let locked = lock_sample(&expander, &mut diags);

    let expanded = expand_parameters(
        "app",
        &[],
        &[Parameter::new("token", ""), Parameter::new("region", "${cloud.region}")],
        &locked,
        &Default::default(),
        &expander,
        &mut diags,
    );
    assert_eq!(expanded[0].value, "(unknown)");
    assert_eq!(expanded[1].value, "us-east-1");

    let mut forced = diags.clone();
    assert!(forced.escalate(true).is_ok());
    assert!(forced.warnings().any(|w| w.message.contains("token|app")));

    match diags.escalate(false) {
        Err(HubError::Multiple { errors }) => {
            assert!(matches!(&errors[0], HubError::UnresolvedParameter { name } if name == "token|app"));
        }
        other => panic!("expected escalated errors, got {other:?}"),
    }
}

/// Conflicting outputs from a re-run component keep the latest value and warn.
#[test]
fn test_rerun_component_output_conflict() {
    let mut state = StackState::default();
    let mut diags = Diagnostics::new();
    state.record_component("db", vec![CapturedOutput::new("db", "endpoint", "old")], &mut diags);
    state.record_component("db", vec![CapturedOutput::new("db", "endpoint", "new")], &mut diags);

    assert_eq!(state.outputs.get(&Key::output("db", "endpoint")).map(|o| o.value.as_str()), Some("new"));
    assert_eq!(diags.warnings().count(), 1);
    assert_eq!(state.components, vec!["db"]);
}
