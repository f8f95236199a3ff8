//! Pruebas de integración del ejecutor secuencial: gating, enhebrado de
//! estado, fallos, sustituciones y reanudación desde snapshots.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::{indexmap, IndexMap};
use serde_json::json;

use fab_config::{VarKind, Variable};
use fab_core::registry::register_step;
use fab_core::{
    Alert, AlertClass, FlowDefinition, FlowStatus, SequentialFlow, Step, StepContext, StepError,
    StepFailure, StepStatus, StepUpdate,
};
use fab_domain::{DesignFormat, MetricValue, State};

/// Step de prueba determinista: produce una vista y una métrica, y cuenta
/// cuántas veces corrió.
struct ProbeStep {
    id: &'static str,
    output: DesignFormat,
    fail: bool,
    runs: Arc<AtomicUsize>,
}

impl Step for ProbeStep {
    fn id(&self) -> &str {
        self.id
    }
    fn inputs(&self) -> Vec<DesignFormat> {
        vec![]
    }
    fn outputs(&self) -> Vec<DesignFormat> {
        vec![self.output]
    }
    fn config_vars(&self) -> Vec<Variable> {
        vec![
            Variable::new("RUN_CTS", VarKind::Bool, "Enables clock tree synthesis.")
                .with_default(json!(true)),
        ]
    }
    fn run(&self, ctx: &StepContext<'_>) -> Result<StepUpdate, StepFailure> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StepError::from_alerts(
                self.id,
                vec![Alert {
                    code: "GRT-0116".into(),
                    class: AlertClass::Error,
                    message: "congestion too high".into(),
                }],
            )
            .into());
        }
        Ok(StepUpdate::default()
            .with_view(self.output, ctx.step_dir().join("design.out"))
            .with_metric(
                format!("{}__count__corner:nom", self.id.to_lowercase().replace('.', "_")),
                MetricValue::Int(1),
            ))
    }
}

fn register_probe(id: &'static str, output: DesignFormat, fail: bool) -> Arc<AtomicUsize> {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    register_step(id, move || {
        Box::new(ProbeStep {
            id,
            output,
            fail,
            runs: Arc::clone(&counter),
        })
    });
    runs
}

fn user_config() -> IndexMap<String, serde_json::Value> {
    indexmap! { "DESIGN_NAME".to_string() => json!("aes_core") }
}

#[test]
fn completed_flow_threads_state_and_persists_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    register_probe("It.Synth", DesignFormat::Netlist, false);
    register_probe("It.Floorplan", DesignFormat::Odb, false);

    let definition = FlowDefinition::new("ItClassic", vec!["It.Synth", "It.Floorplan"]);
    let flow =
        SequentialFlow::new(definition, &user_config(), &IndexMap::new(), dir.path()).unwrap();
    let result = flow.run(State::new()).unwrap();

    assert_eq!(result.status, FlowStatus::Completed);
    assert!(result.state.view(DesignFormat::Netlist).is_some());
    assert!(result.state.view(DesignFormat::Odb).is_some());
    // el agregado derivado aparece junto a la métrica cruda
    assert_eq!(
        result.state.metric("it_synth__count"),
        Some(&MetricValue::Int(1))
    );
    assert!(dir.path().join("01-it-synth/state_out.json").is_file());
    assert!(dir.path().join("02-it-floorplan/state_out.json").is_file());
    assert!(dir.path().join("flow_run.json").is_file());
    assert!(result
        .records
        .iter()
        .all(|r| r.status == StepStatus::Completed));
}

#[test]
fn closed_gate_skips_without_instantiating_work() {
    let dir = tempfile::tempdir().unwrap();
    register_probe("It.Place", DesignFormat::Odb, false);
    let cts_runs = register_probe("It.Cts", DesignFormat::Def, false);

    let definition = FlowDefinition::new("ItGated", vec!["It.Place", "It.Cts"])
        .with_gate("It.Cts", vec!["RUN_CTS"]);
    let mut user = user_config();
    user.insert("RUN_CTS".to_string(), json!(false));

    let flow = SequentialFlow::new(definition, &user, &IndexMap::new(), dir.path()).unwrap();
    let result = flow.run(State::new()).unwrap();

    assert_eq!(result.status, FlowStatus::Completed);
    assert_eq!(cts_runs.load(Ordering::SeqCst), 0);
    assert_eq!(
        result.records[1].status,
        StepStatus::Skipped {
            gate: "RUN_CTS".to_string()
        }
    );
    // el step saltado no aporta vistas ni snapshot
    assert!(result.state.view(DesignFormat::Def).is_none());
    assert!(!dir.path().join("02-it-cts").exists());
}

#[test]
fn failing_step_halts_and_preserves_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    register_probe("It.GoodSynth", DesignFormat::Netlist, false);
    register_probe("It.BadRoute", DesignFormat::Def, true);
    let later_runs = register_probe("It.NeverRuns", DesignFormat::Gds, false);

    let definition = FlowDefinition::new(
        "ItFailing",
        vec!["It.GoodSynth", "It.BadRoute", "It.NeverRuns"],
    );
    let flow =
        SequentialFlow::new(definition, &user_config(), &IndexMap::new(), dir.path()).unwrap();
    let result = flow.run(State::new()).unwrap();

    assert_eq!(
        result.status,
        FlowStatus::Failed {
            step_id: "It.BadRoute".to_string()
        }
    );
    assert_eq!(later_runs.load(Ordering::SeqCst), 0);
    assert_eq!(result.records.len(), 2);
    match &result.records[1].status {
        StepStatus::Failed {
            recoverable,
            message,
        } => {
            assert!(*recoverable);
            assert!(message.contains("GRT-0116"));
        }
        other => panic!("se esperaba Failed, hay {other:?}"),
    }
    // el estado del step exitoso sigue disponible para el postmortem
    assert!(result.state.view(DesignFormat::Netlist).is_some());
    assert!(result.state.view(DesignFormat::Def).is_none());
}

#[test]
fn substitutions_shape_the_executed_list() {
    let dir = tempfile::tempdir().unwrap();
    register_probe("It.LintA", DesignFormat::Netlist, false);
    let lint_b = register_probe("It.LintB", DesignFormat::Netlist, false);
    register_probe("It.Harden", DesignFormat::Gds, false);
    let replacement = register_probe("It.LintStrict", DesignFormat::Netlist, false);

    let definition = FlowDefinition::new("ItSubst", vec!["It.LintA", "It.LintB", "It.Harden"])
        .with_substitution("It.LintB", None)
        .with_substitution("It.LintA", Some("It.LintStrict"));
    let flow =
        SequentialFlow::new(definition, &user_config(), &IndexMap::new(), dir.path()).unwrap();
    let result = flow.run(State::new()).unwrap();

    assert_eq!(result.status, FlowStatus::Completed);
    assert_eq!(lint_b.load(Ordering::SeqCst), 0);
    assert_eq!(replacement.load(Ordering::SeqCst), 1);
    let ids: Vec<&str> = result.records.iter().map(|r| r.step_id.as_str()).collect();
    assert_eq!(ids, vec!["It.LintStrict", "It.Harden"]);
}

#[test]
fn a_new_run_can_seed_from_the_last_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    register_probe("It.SeedSynth", DesignFormat::Netlist, false);

    let definition = FlowDefinition::new("ItResume", vec!["It.SeedSynth"]);
    let flow =
        SequentialFlow::new(definition.clone(), &user_config(), &IndexMap::new(), dir.path())
            .unwrap();
    let first = flow.run(State::new()).unwrap();
    assert_eq!(first.status, FlowStatus::Completed);

    let resumed = SequentialFlow::latest_snapshot(dir.path()).unwrap().unwrap();
    assert_eq!(resumed, first.state);

    // un directorio sin corridas no aporta semilla
    let empty = tempfile::tempdir().unwrap();
    assert!(SequentialFlow::latest_snapshot(empty.path())
        .unwrap()
        .is_none());
}

#[test]
fn resume_prefers_the_highest_numbered_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    // "100-" ordena lexicográficamente antes que "99-"; la reanudación debe
    // ir por el prefijo numérico
    let snapshot_at = |name: &str, count: i64| {
        let step_dir = dir.path().join(name);
        std::fs::create_dir_all(&step_dir).unwrap();
        let state = State::new().fold(
            &Default::default(),
            &indexmap! { "steps__count".to_string() => MetricValue::Int(count) },
        );
        state
            .save(&step_dir.join(fab_core::flow::sequential::STATE_FILE))
            .unwrap();
        state
    };
    snapshot_at("99-it-penultimate", 99);
    let last = snapshot_at("100-it-last", 100);

    let resumed = SequentialFlow::latest_snapshot(dir.path()).unwrap().unwrap();
    assert_eq!(resumed, last);
    assert_eq!(resumed.metric("steps__count"), Some(&MetricValue::Int(100)));
}

#[test]
fn interruption_stops_at_the_next_step_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let runs = register_probe("It.Interrupted", DesignFormat::Netlist, false);

    let definition = FlowDefinition::new("ItInterrupt", vec!["It.Interrupted"]);
    let flow =
        SequentialFlow::new(definition, &user_config(), &IndexMap::new(), dir.path()).unwrap();
    flow.interrupt_handle().store(true, Ordering::SeqCst);
    let result = flow.run(State::new()).unwrap();

    assert_eq!(
        result.status,
        FlowStatus::Interrupted {
            step_id: "It.Interrupted".to_string()
        }
    );
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(result.records[0].status, StepStatus::Interrupted);
}

#[test]
fn unknown_step_id_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let definition = FlowDefinition::new("ItUnknown", vec!["It.DoesNotExist"]);
    let err = SequentialFlow::new(definition, &user_config(), &IndexMap::new(), dir.path())
        .unwrap_err();
    assert!(err.to_string().contains("It.DoesNotExist"));
}
