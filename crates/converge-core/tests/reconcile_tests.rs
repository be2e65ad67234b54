use converge_core::{
    Backend, ConfigEntry, DesiredParams, EngineError, ErrorKind, Reconciler, CONNECTION_OPTION,
    CONNECTION_SECTION,
};
use converge_test_utils::{embedded_params, entry, params_with, Call, LogCapture, MemoryEngine};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::path::Path;

#[test]
fn creation_counts_as_change_even_without_config() {
    let engine = MemoryEngine::new();
    let reconciler = Reconciler::new(engine.clone());

    let result = reconciler.run(embedded_params("empty")).unwrap();

    assert!(result.changed);
    assert!(result.created);
    assert!(result.applied.is_empty());
    assert!(engine.exists(Path::new("/srv/empty")));
    assert_eq!(
        engine.value(Path::new("/srv/empty"), CONNECTION_SECTION, CONNECTION_OPTION),
        Some("sqlite:db/project.db".to_string())
    );
}

#[test]
fn debug_logs_never_carry_the_database_password() {
    let engine = MemoryEngine::new();
    let reconciler = Reconciler::new(&engine);
    let params = DesiredParams::new("tracker", "/srv/tracker")
        .with_backend(Backend::MySql)
        .with_password("TOPSECRET")
        .with_entry(entry("logging", "log_type", "file"));

    let logs = LogCapture::new();
    tracing::subscriber::with_default(logs.subscriber(), || {
        reconciler.run(params.clone()).unwrap();
        reconciler.run(params).unwrap();
    });

    let output = logs.contents();
    assert!(output.contains("writing entry"));
    assert!(output.contains("url"));
    assert!(!output.contains("TOPSECRET"));
}

#[test]
fn second_identical_run_is_a_no_op() {
    let engine = MemoryEngine::new();
    let reconciler = Reconciler::new(&engine);
    let params = params_with(
        "tracker",
        &[entry("logging", "log_type", "file"), entry("project", "descr", "")],
    );

    let first = reconciler.run(params.clone()).unwrap();
    let second = reconciler.run(params).unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert!(!second.created);
    assert!(second.applied.is_empty());
}

#[test]
fn only_differing_entries_are_written() {
    let path = Path::new("/srv/tracker");
    let engine = MemoryEngine::new().with_environment(path, &[entry("s1", "o1", "a")]);
    let reconciler = Reconciler::new(&engine);

    let result = reconciler
        .run(params_with("tracker", &[entry("s1", "o1", "a"), entry("s2", "o2", "b")]))
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.applied, vec![entry("s2", "o2", "b")]);
    // connection entry + one delta entry
    assert_eq!(engine.writes(), 2);
    assert_eq!(engine.value(path, "s2", "o2"), Some("b".to_string()));
}

#[test]
fn equal_config_rewrites_only_connection() {
    let path = Path::new("/srv/tracker");
    let engine = MemoryEngine::new()
        .with_environment(path, &[entry("s1", "o1", "a"), entry("s2", "o2", "b")]);
    let reconciler = Reconciler::new(&engine);

    let result = reconciler
        .run(params_with("tracker", &[entry("s1", "o1", "a"), entry("s2", "o2", "b")]))
        .unwrap();

    assert!(!result.changed);
    assert_eq!(engine.writes(), 1);
    assert_eq!(engine.count(Call::Save), 1);
    assert_eq!(engine.count(Call::Create), 0);
}

#[test]
fn missing_store_is_reported_without_writes() {
    let path = Path::new("/srv/tracker");
    let engine = MemoryEngine::new().with_environment(path, &[entry("s1", "o1", "a")]);
    engine.remove_store(path);
    let reconciler = Reconciler::new(&engine);

    let err = reconciler
        .run(params_with("tracker", &[entry("s1", "o1", "a")]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigKeyMissing);
    assert!(err.to_string().starts_with("project configuration not found at"));
    assert_eq!(engine.writes(), 0);
    assert_eq!(engine.count(Call::Save), 0);
}

#[test]
fn missing_password_makes_no_engine_calls() {
    let engine = MemoryEngine::new();
    let reconciler = Reconciler::new(&engine);

    let params = embedded_params("tracker").with_backend(Backend::PostgreSql);
    let err = reconciler.run(params).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(engine.total_calls(), 0);
}

#[test]
fn networked_connection_string_is_persisted() {
    let engine = MemoryEngine::new();
    let reconciler = Reconciler::new(&engine);

    let params = DesiredParams::new("tracker", "/srv/tracker")
        .with_backend(Backend::MySql)
        .with_host("h")
        .with_user("u")
        .with_password("p")
        .with_database_name("d");
    reconciler.run(params).unwrap();

    assert_eq!(
        engine.value(Path::new("/srv/tracker"), CONNECTION_SECTION, CONNECTION_OPTION),
        Some("mysql://u:p@h/d".to_string())
    );
}

#[test]
fn backend_switch_rewrites_connection_without_reporting_change() {
    let engine = MemoryEngine::new();
    let reconciler = Reconciler::new(&engine);
    reconciler.run(embedded_params("tracker")).unwrap();

    let result = reconciler
        .run(
            embedded_params("tracker")
                .with_backend(Backend::PostgreSql)
                .with_password("pw"),
        )
        .unwrap();

    assert!(!result.changed);
    assert_eq!(
        engine.value(Path::new("/srv/tracker"), CONNECTION_SECTION, CONNECTION_OPTION),
        Some("postgresql://tracker:pw@localhost/tracker".to_string())
    );
}

#[test]
fn probe_failure_is_fatal_and_nothing_is_created() {
    let engine =
        MemoryEngine::new().fail_on(Call::Open, EngineError::PermissionDenied("/srv".into()));
    let reconciler = Reconciler::new(&engine);

    let err = reconciler.run(embedded_params("tracker")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert_eq!(engine.count(Call::Create), 0);
}

#[test]
fn write_failure_propagates_after_partial_apply() {
    let path = Path::new("/srv/tracker");
    let engine = MemoryEngine::new()
        .with_environment(path, &[])
        .fail_on(Call::Save, EngineError::Storage("read-only filesystem".into()));
    let reconciler = Reconciler::new(&engine);

    let err = reconciler
        .run(params_with("tracker", &[entry("s", "o", "v")]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert!(err.to_string().contains("read-only filesystem"));
    assert_eq!(engine.value(path, "s", "o"), None);
    // handle still released
    assert_eq!(engine.calls().last(), Some(&Call::Shutdown));
}

#[test]
fn call_order_for_existing_environment() {
    let path = Path::new("/srv/tracker");
    let engine = MemoryEngine::new().with_environment(path, &[]);
    let reconciler = Reconciler::new(&engine);

    reconciler
        .run(params_with("tracker", &[entry("a", "b", "c")]))
        .unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            Call::Open,
            Call::Shutdown,
            Call::ConfigValue,
            Call::Open,
            Call::SetConfigValue,
            Call::SetConfigValue,
            Call::Save,
            Call::Shutdown,
        ]
    );
}

fn arb_entry() -> impl Strategy<Value = ConfigEntry> {
    ("[a-c]", "[x-z]", "[a-z0-9]{0,4}")
        .prop_map(|(s, o, v)| ConfigEntry::new(s, o, v).unwrap())
}

proptest! {
    #[test]
    fn prop_repeated_runs_converge(
        seeded in proptest::collection::vec(arb_entry(), 0..6),
        desired in proptest::collection::vec(arb_entry(), 0..8),
        exists in any::<bool>(),
    ) {
        let engine = if exists {
            MemoryEngine::new().with_environment("/srv/p", &seeded)
        } else {
            MemoryEngine::new()
        };
        let reconciler = Reconciler::new(&engine);

        let first = reconciler.run(params_with("p", &desired)).unwrap();
        prop_assert_eq!(first.created, !exists);

        // last write wins for every desired key
        for e in &desired {
            let last = desired.iter().rev().find(|d| d.key() == e.key()).unwrap();
            prop_assert_eq!(
                engine.value(Path::new("/srv/p"), &e.section, &e.option),
                Some(last.value.clone())
            );
        }

        let has_conflicting_duplicates = desired.iter().any(|a| {
            desired.iter().any(|b| a.key() == b.key() && a.value != b.value)
        });
        if !has_conflicting_duplicates {
            let second = reconciler.run(params_with("p", &desired)).unwrap();
            prop_assert!(!second.changed);
        }
    }
}
