//! Frontera de invocación de herramientas externas.
//!
//! Cada step envuelve una única invocación. La salida combinada de la
//! herramienta se registra línea a línea en `tool.log` dentro del directorio
//! del step y se decodifica con los procesadores del step; las alerts
//! resultantes pasan por el hook `on_alert` y deciden el veredicto:
//!
//! - alerts de clase error presentes → `StepError`, incluso con exit 0;
//! - exit distinto de cero sin alert de error parseable → `StepException`;
//! - interrupción externa → la herramienta se termina y no se pliega nada.
//!
//! La herramienta puede dejar métricas en `metrics_out.json`; un archivo
//! ausente o ilegible significa "sin métricas", nunca un error.
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use fab_domain::MetricsUpdate;

use crate::alert::{Alert, AlertClass};
use crate::errors::{StepError, StepException, StepFailure};
use crate::step::{Step, StepContext};

/// Log combinado de la herramienta dentro del directorio del step.
pub const LOG_FILE: &str = "tool.log";
/// Archivo de métricas que la herramienta puede dejar en el directorio.
pub const METRICS_FILE: &str = "metrics_out.json";

/// Resultado de una invocación que no falló.
#[derive(Debug)]
pub struct SubprocessOutcome {
    pub exit_code: i32,
    /// Todas las alerts tras `on_alert`, en orden de aparición.
    pub alerts: Vec<Alert>,
    pub metrics: MetricsUpdate,
}

fn exception(message: String) -> StepFailure {
    StepFailure::Exception(StepException(message))
}

/// Ejecuta `command`, decodifica su salida y aplica la taxonomía de fallos.
pub fn run_subprocess(
    step: &dyn Step,
    ctx: &StepContext<'_>,
    mut command: Command,
) -> Result<SubprocessOutcome, StepFailure> {
    if ctx.interrupted() {
        return Err(StepFailure::Interrupted(ctx.step_id().to_string()));
    }

    fs::create_dir_all(ctx.step_dir())
        .map_err(|e| exception(format!("cannot create step directory: {e}")))?;
    let mut log_file = fs::File::create(ctx.step_dir().join(LOG_FILE))
        .map_err(|e| exception(format!("cannot create {LOG_FILE}: {e}")))?;

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command
        .spawn()
        .map_err(|e| exception(format!("'{}' failed to spawn tool: {e}", ctx.step_id())))?;

    let (tx, rx) = mpsc::channel::<String>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        readers.push(thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        }));
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        readers.push(thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let processors = step.output_processors();
    let mut alerts = Vec::new();
    let interrupt = ctx.interrupt_flag();
    let mut was_interrupted = false;

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(line) => {
                let _ = writeln!(log_file, "{line}");
                let decoded = processors.iter().find_map(|p| p.process_line(&line));
                match decoded {
                    Some(alert) => {
                        if let Some(alert) = step.on_alert(alert) {
                            match alert.class {
                                AlertClass::Error => log::error!("{alert}"),
                                AlertClass::Warning => log::warn!("{alert}"),
                                AlertClass::Info => log::info!("{alert}"),
                            }
                            alerts.push(alert);
                        }
                    }
                    None => log::debug!("{line}"),
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if interrupt.load(std::sync::atomic::Ordering::SeqCst) {
                    let _ = child.kill();
                    was_interrupted = true;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    for reader in readers {
        let _ = reader.join();
    }

    let status = child
        .wait()
        .map_err(|e| exception(format!("wait on tool failed: {e}")))?;

    if was_interrupted {
        return Err(StepFailure::Interrupted(ctx.step_id().to_string()));
    }

    let metrics = read_metrics_file(ctx);

    let errors: Vec<Alert> = alerts
        .iter()
        .filter(|a| a.class == AlertClass::Error)
        .cloned()
        .collect();
    if !errors.is_empty() {
        return Err(StepFailure::Error(StepError::from_alerts(
            ctx.step_id(),
            errors,
        )));
    }

    match status.code() {
        Some(0) => Ok(SubprocessOutcome {
            exit_code: 0,
            alerts,
            metrics,
        }),
        Some(code) => Err(exception(format!(
            "'{}' exited with code {code} without reporting a parseable error",
            ctx.step_id()
        ))),
        None => Err(exception(format!(
            "'{}' was terminated by a signal",
            ctx.step_id()
        ))),
    }
}

fn read_metrics_file(ctx: &StepContext<'_>) -> MetricsUpdate {
    let path = ctx.step_dir().join(METRICS_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return MetricsUpdate::new(),
    };
    match serde_json::from_str::<MetricsUpdate>(&raw) {
        Ok(metrics) => metrics,
        Err(e) => {
            log::warn!(
                "'{}': unparseable {METRICS_FILE}, ignoring it: {e}",
                ctx.step_id()
            );
            MetricsUpdate::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepUpdate;
    use crate::toolbox::Toolbox;
    use fab_config::Config;
    use fab_domain::{DesignFormat, MetricValue, State};

    struct ShellStep {
        demote: &'static [&'static str],
    }

    impl Step for ShellStep {
        fn id(&self) -> &str {
            "Test.Shell"
        }
        fn inputs(&self) -> Vec<DesignFormat> {
            vec![]
        }
        fn outputs(&self) -> Vec<DesignFormat> {
            vec![]
        }
        fn on_alert(&self, alert: Alert) -> Option<Alert> {
            if self.demote.contains(&alert.code.as_str()) {
                Some(alert.reclassified(AlertClass::Warning))
            } else {
                Some(alert)
            }
        }
        fn run(&self, _ctx: &StepContext<'_>) -> Result<StepUpdate, StepFailure> {
            Ok(StepUpdate::default())
        }
    }

    fn run_script(step: &ShellStep, script: &str) -> Result<SubprocessOutcome, StepFailure> {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let toolbox = Toolbox::new("nom");
        let state = State::new();
        let ctx = StepContext::for_step(step, &config, &state, dir.path().join("step"), &toolbox);
        let mut command = Command::new("/bin/sh");
        let script = format!("cd '{}' && {script}", dir.path().join("step").display());
        command.arg("-c").arg(script);
        run_subprocess(step, &ctx, command)
    }

    #[test]
    fn classified_error_alert_wins_over_exit_code() {
        let step = ShellStep { demote: &[] };
        let failure = run_script(&step, "echo '[ERROR EXA-0001] boom'; exit 2").unwrap_err();
        match failure {
            StepFailure::Error(e) => {
                assert_eq!(e.alerts.len(), 1);
                assert_eq!(e.alerts[0].code, "EXA-0001");
                assert!(e.message.contains("Test.Shell"));
            }
            other => panic!("se esperaba StepError, hay {other:?}"),
        }
    }

    #[test]
    fn error_alert_fails_even_on_exit_zero() {
        let step = ShellStep { demote: &[] };
        let failure = run_script(&step, "echo '[ERROR EXA-0001] boom'; exit 0").unwrap_err();
        assert!(failure.is_recoverable());
    }

    #[test]
    fn silent_nonzero_exit_is_an_exception() {
        let step = ShellStep { demote: &[] };
        let failure = run_script(&step, "echo nothing interesting; exit 3").unwrap_err();
        match failure {
            StepFailure::Exception(e) => assert!(e.0.contains("code 3")),
            other => panic!("se esperaba StepException, hay {other:?}"),
        }
    }

    #[test]
    fn demoted_alert_does_not_fail_the_step() {
        let step = ShellStep {
            demote: &["ORD-0039"],
        };
        let outcome = run_script(&step, "echo '[ERROR ORD-0039] benign'; exit 0").unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(outcome.alerts[0].class, AlertClass::Warning);
    }

    #[test]
    fn in_flight_interruption_kills_the_tool_and_folds_nothing() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::time::Instant;

        let step = ShellStep { demote: &[] };
        let dir = tempfile::tempdir().unwrap();
        let step_dir = dir.path().join("step");
        let config = Config::default();
        let toolbox = Toolbox::new("nom");
        let state = State::new();
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = StepContext::for_step(&step, &config, &state, &step_dir, &toolbox)
            .with_interrupt(Arc::clone(&flag));

        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg("echo started; exec sleep 30");

        let setter = {
            let flag = Arc::clone(&flag);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                flag.store(true, Ordering::SeqCst);
            })
        };
        let started = Instant::now();
        let failure = run_subprocess(&step, &ctx, command).unwrap_err();
        setter.join().unwrap();

        assert!(matches!(failure, StepFailure::Interrupted(_)));
        // la herramienta murió mucho antes de su sleep de 30s
        assert!(started.elapsed() < Duration::from_secs(10));
        // nada que plegar: ni vistas ni métricas quedaron atrás
        assert!(!step_dir.join(METRICS_FILE).exists());
    }

    #[test]
    fn metrics_file_is_parsed_with_sentinels() {
        let step = ShellStep { demote: &[] };
        let outcome = run_script(
            &step,
            r#"printf '{"route__wirelength": 1234, "timing__setup__ws": "-Infinity"}' > metrics_out.json"#,
        )
        .unwrap();
        assert_eq!(
            outcome.metrics.get("route__wirelength"),
            Some(&MetricValue::Int(1234))
        );
        assert_eq!(
            outcome.metrics.get("timing__setup__ws"),
            Some(&MetricValue::NegInfinity)
        );
    }

    #[test]
    fn absent_or_broken_metrics_file_means_no_metrics() {
        let step = ShellStep { demote: &[] };
        let outcome = run_script(&step, "true").unwrap();
        assert!(outcome.metrics.is_empty());

        let outcome = run_script(&step, "printf 'not json' > metrics_out.json").unwrap();
        assert!(outcome.metrics.is_empty());
    }
}
