//! Built-in algorithm modules.
//!
//! The configuration's `modules` list selects which of these get registered
//! at startup. A name that fails to resolve or build is logged and skipped,
//! never fatal to the server.

use std::time::{Duration, Instant};

use easyapi_core::{
    Algorithm, AlgorithmRegistry, CoreError, EntryOutput, IoMap, IoType, IoTypeRegistry, IoValue,
};
use serde_json::json;

/// Register the named modules. Unknown names and build failures are skipped
/// with a warning.
pub fn register(names: &[String], algorithms: &AlgorithmRegistry, iotypes: &IoTypeRegistry) {
    for name in names {
        match build_module(name, iotypes) {
            Ok(built) => {
                for algorithm in built {
                    tracing::info!(algorithm = %algorithm.id, module = %name, "algorithm registered");
                    algorithms.add(algorithm);
                }
            }
            Err(e) => {
                tracing::warn!(module = %name, error = %e, "module load failed, skipping");
            }
        }
    }
}

fn build_module(name: &str, iotypes: &IoTypeRegistry) -> Result<Vec<Algorithm>, CoreError> {
    match name {
        "arith" => arith(iotypes),
        other => Err(CoreError::LoadFailure(other.to_string())),
    }
}

fn number(inputs: &IoMap, name: &str) -> f64 {
    match inputs.get(name) {
        Some(IoValue::Number(n)) => *n,
        _ => 0.0,
    }
}

fn text(inputs: &IoMap, name: &str) -> String {
    match inputs.get(name) {
        Some(IoValue::Text(t)) => t.clone(),
        _ => String::new(),
    }
}

fn arith(iotypes: &IoTypeRegistry) -> Result<Vec<Algorithm>, CoreError> {
    let sum = Algorithm::builder("sum")
        .name("Add Two Numbers")
        .description("Add two float numbers together and return the result.")
        .version("0.0.1")
        .resource("cpu", -1)
        .resource("cuda", 0)
        .input("a", IoType::number(), "The first number")
        .input_default("b", IoType::number(), "The second number", json!(10))
        .output("sum", IoType::number(), "The sum of the numbers")
        .entry(|inputs, _ctx| {
            let mut out = EntryOutput::new();
            out.insert("sum".to_string(), json!(number(inputs, "a") + number(inputs, "b")));
            Ok(out)
        })
        .build(iotypes)?;

    let slow_echo = Algorithm::builder("slow-echo")
        .name("Slow Echo")
        .description("Return the input text after a configurable delay.")
        .version("0.0.1")
        .resource("cpu", 1)
        .input("text", IoType::text(), "The text to echo back")
        .input_default("delay", IoType::number(), "Seconds to wait before replying", json!(0))
        .output("text", IoType::text(), "The echoed text")
        .cache_disable(true)
        .entry(|inputs, ctx| {
            let deadline =
                Instant::now() + Duration::from_secs_f64(number(inputs, "delay").max(0.0));
            // Sleep in slices so a cancellation shortens the wait.
            while Instant::now() < deadline {
                if ctx.cancel.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            let mut out = EntryOutput::new();
            out.insert("text".to_string(), json!(text(inputs, "text")));
            Ok(out)
        })
        .build(iotypes)?;

    Ok(vec![sum, slow_echo])
}
