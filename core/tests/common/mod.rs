#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use rewind_core::{CommandDef, UndoEngine};

/// Test engine over a shared numeric context and i64 values.
pub type Engine = UndoEngine<AtomicI64, i64>;

pub fn counter_engine() -> (Engine, Arc<AtomicI64>) {
    (Engine::new(), Arc::new(AtomicI64::new(0)))
}

/// Synchronous command adding a fixed amount; undo subtracts it.
pub fn add_cmd(value: &Arc<AtomicI64>, name: &str, amount: i64) -> CommandDef<AtomicI64, i64> {
    let ev = value.clone();
    let uv = value.clone();
    CommandDef::new(name)
        .execute(move |_ctx, _params| {
            let v = ev.clone();
            async move { Ok(v.fetch_add(amount, Ordering::SeqCst) + amount) }
        })
        .undo(move |_params, _returned, _cached| {
            let v = uv.clone();
            async move { Ok(v.fetch_sub(amount, Ordering::SeqCst) - amount) }
        })
}

/// Adds its first parameter; undo subtracts it again.
pub fn param_add_cmd(value: &Arc<AtomicI64>, name: &str) -> CommandDef<AtomicI64, i64> {
    let ev = value.clone();
    let uv = value.clone();
    CommandDef::new(name)
        .execute(move |_ctx, params| {
            let v = ev.clone();
            async move {
                let amount = params[0];
                Ok(v.fetch_add(amount, Ordering::SeqCst) + amount)
            }
        })
        .undo(move |params, _returned, _cached| {
            let v = uv.clone();
            async move {
                let amount = params[0];
                Ok(v.fetch_sub(amount, Ordering::SeqCst) - amount)
            }
        })
}

/// Doubles the value; undo halves it.
pub fn times2_cmd(value: &Arc<AtomicI64>, name: &str) -> CommandDef<AtomicI64, i64> {
    let ev = value.clone();
    let uv = value.clone();
    CommandDef::new(name)
        .execute(move |_ctx, _params| {
            let v = ev.clone();
            async move {
                let old = v.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| Some(x * 2));
                Ok(old.unwrap_or(0) * 2)
            }
        })
        .undo(move |_params, _returned, _cached| {
            let v = uv.clone();
            async move {
                let old = v.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| Some(x / 2));
                Ok(old.unwrap_or(0) / 2)
            }
        })
}

/// Like `param_add_cmd` but execute suspends on `gate` first, so the test
/// controls when the invocation completes.
pub fn gated_param_add_cmd(
    value: &Arc<AtomicI64>,
    gate: &Arc<Notify>,
    name: &str,
) -> CommandDef<AtomicI64, i64> {
    let ev = value.clone();
    let eg = gate.clone();
    let uv = value.clone();
    CommandDef::new(name)
        .execute(move |_ctx, params| {
            let v = ev.clone();
            let g = eg.clone();
            async move {
                g.notified().await;
                let amount = params.first().copied().unwrap_or(0);
                Ok(v.fetch_add(amount, Ordering::SeqCst) + amount)
            }
        })
        .undo(move |params, _returned, _cached| {
            let v = uv.clone();
            async move {
                let amount = params.first().copied().unwrap_or(0);
                Ok(v.fetch_sub(amount, Ordering::SeqCst) - amount)
            }
        })
}

/// Ids of the history entries, oldest first.
pub fn stack_ids(engine: &Engine) -> Vec<u64> {
    engine.history().iter().map(|entry| entry.id).collect()
}

/// Registry indexes of the history entries, oldest first.
pub fn stack_commands(engine: &Engine) -> Vec<usize> {
    engine.history().iter().map(|entry| entry.command).collect()
}

/// Id of the committed entry whose single parameter equals `param`.
pub fn id_for_param(engine: &Engine, param: i64) -> u64 {
    engine
        .history()
        .iter()
        .find(|entry| entry.params == vec![param])
        .unwrap_or_else(|| panic!("no stack entry with param {param}"))
        .id
}

/// Give spawned tasks time to reach their next suspension point.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}

/// Route engine tracing to the test output when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
