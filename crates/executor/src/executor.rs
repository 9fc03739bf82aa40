//! Sandboxed script evaluation
//!
//! Pre-execution checks run in a fixed order: length limit, denylist scan,
//! parse. Nothing touches the connection until all three pass. Execution is
//! then a straight walk over the statements; every terminal call a script
//! makes goes through the operation gateway and gets the same validation a
//! structured request would.

use crate::error::{ExecError, ExecResult};
use crate::parse::{Expr, Stmt, parse_script};
use crate::scan::scan;
use crate::value::Value;
use log::debug;
use meridian_gateway::{OperationGateway, ParamKind, StructuredRequest};
use meridian_ports::error::ComputeError;
use meridian_ports::{IndicatorParams, IndicatorSet, Terminal};
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Binding names checked for the script's result, in priority order
const RESULT_NAMES: &[&str] = &["result", "data", "output", "res"];

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub max_source_len: usize,
    pub max_statements: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_source_len: 10_000,
            max_statements: 200,
        }
    }
}

/// Successful script run
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub result: Value,
    /// Every name the script bound, in binding order
    pub bindings: Vec<String>,
    /// Corrections the gateway applied along the way
    pub corrections: Vec<String>,
}

type Env = BTreeMap<String, Value>;

/// Evaluates scripts against the gateway and the indicator set
pub struct SandboxExecutor<T: Terminal> {
    gateway: Arc<OperationGateway<T>>,
    indicators: IndicatorSet,
    config: ExecutorConfig,
}

impl<T: Terminal> SandboxExecutor<T> {
    pub fn new(
        gateway: Arc<OperationGateway<T>>,
        indicators: IndicatorSet,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            gateway,
            indicators,
            config,
        }
    }

    /// Run one script end to end
    pub async fn eval(&self, source: &str) -> ExecResult<ScriptOutcome> {
        if source.len() > self.config.max_source_len {
            return Err(ExecError::TooLong {
                limit: self.config.max_source_len,
                actual: source.len(),
            });
        }
        if let Some(pattern) = scan(source) {
            return Err(ExecError::Forbidden {
                construct: pattern.construct.to_string(),
                reason: pattern.reason.to_string(),
            });
        }
        let statements = parse_script(source).map_err(|failure| ExecError::Syntax {
            line: failure.line,
            message: failure.message,
        })?;
        if statements.len() > self.config.max_statements {
            return Err(ExecError::Syntax {
                line: 1,
                message: format!(
                    "script has {} statements, limit is {}",
                    statements.len(),
                    self.config.max_statements
                ),
            });
        }

        let mut env = Env::new();
        let mut bindings = Vec::new();
        let mut corrections = Vec::new();
        for stmt in &statements {
            let value = self.eval_stmt(&env, stmt, &mut corrections).await?;
            if let Some(name) = &stmt.target {
                debug!("line {}: {} = <{}>", stmt.line, name, value.type_name());
                if !bindings.contains(name) {
                    bindings.push(name.clone());
                }
                env.insert(name.clone(), value);
            }
        }

        // Named bindings only; a bare trailing expression is not a result
        for name in RESULT_NAMES {
            if let Some(value) = env.remove(*name) {
                return Ok(ScriptOutcome {
                    result: value,
                    bindings,
                    corrections,
                });
            }
        }
        Err(ExecError::NoResult { bindings })
    }

    async fn eval_stmt(
        &self,
        env: &Env,
        stmt: &Stmt,
        corrections: &mut Vec<String>,
    ) -> ExecResult<Value> {
        self.eval_expr(env, &stmt.expr, stmt.line, corrections).await
    }

    fn eval_expr<'a>(
        &'a self,
        env: &'a Env,
        expr: &'a Expr,
        line: usize,
        corrections: &'a mut Vec<String>,
    ) -> Pin<Box<dyn Future<Output = ExecResult<Value>> + Send + 'a>>
    where
        T: 'a,
    {
        Box::pin(async move {
            match expr {
                Expr::Int(i) => Ok(Value::Int(*i)),
                Expr::Float(f) => Ok(Value::Float(*f)),
                Expr::Str(s) => Ok(Value::Str(s.clone())),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Ident(name) => env.get(name).cloned().ok_or_else(|| ExecError::Runtime {
                    line,
                    message: format!("undefined variable '{name}'"),
                }),
                Expr::Call { path, args } => {
                    let mut evaluated = Vec::with_capacity(args.len());
                    for arg in args {
                        evaluated.push(self.eval_expr(env, arg, line, corrections).await?);
                    }
                    self.call(path, evaluated, line, corrections).await
                }
            }
        })
    }

    async fn call(
        &self,
        path: &[String],
        args: Vec<Value>,
        line: usize,
        corrections: &mut Vec<String>,
    ) -> ExecResult<Value> {
        let full = path.join(".");

        if path.len() == 1 {
            if let Some(result) = self.builtin(&full, &args, line)? {
                return Ok(result);
            }
        }

        if let Some(indicator) = self.indicators.resolve(&full) {
            return self.run_indicator(indicator.as_ref(), &full, &args, line);
        }

        let operation = full.strip_prefix("terminal.").unwrap_or(&full);
        if self.gateway.registry().resolve(operation).is_some() {
            return self.run_operation(operation, &args, line, corrections).await;
        }

        let mut message = format!("unknown function '{full}'");
        if let Some(nearest) = self.gateway.registry().nearest(operation) {
            message.push_str(&format!(" (did you mean '{nearest}'?)"));
        }
        Err(ExecError::Runtime { line, message })
    }

    /// Small helper vocabulary over containers; returns None for names that
    /// are not builtins so resolution can continue.
    fn builtin(&self, name: &str, args: &[Value], line: usize) -> ExecResult<Option<Value>> {
        let runtime = |message: String| ExecError::Runtime { line, message };
        let result = match name {
            "len" => {
                let value = one_arg("len", args, line)?;
                let length = value
                    .len()
                    .ok_or_else(|| runtime(format!("len() takes a container, got {}", value.type_name())))?;
                Value::Int(length as i64)
            }
            "tail" | "head" => {
                let (value, n) = container_and_count(name, args, line)?;
                slice_value(name, value, n).map_err(runtime)?
            }
            "last" => {
                let value = one_arg("last", args, line)?;
                match value {
                    Value::Series(s) => s
                        .last()
                        .copied()
                        .map(Value::Float)
                        .ok_or_else(|| runtime("last() on an empty series".to_string()))?,
                    Value::Frame(frame) => frame
                        .bars()
                        .last()
                        .map(|bar| Value::Record(serde_json::to_value(bar).unwrap_or_default()))
                        .ok_or_else(|| runtime("last() on an empty frame".to_string()))?,
                    Value::Ticks(ticks) => ticks
                        .last()
                        .map(|tick| Value::Record(serde_json::to_value(tick).unwrap_or_default()))
                        .ok_or_else(|| runtime("last() on empty ticks".to_string()))?,
                    Value::List(names) => names
                        .last()
                        .cloned()
                        .map(Value::Str)
                        .ok_or_else(|| runtime("last() on an empty list".to_string()))?,
                    other => {
                        return Err(runtime(format!(
                            "last() takes a container, got {}",
                            other.type_name()
                        )));
                    }
                }
            }
            "column" => {
                let (frame, column) = match args {
                    [Value::Frame(frame), Value::Str(column)] => (frame, column),
                    _ => {
                        return Err(runtime(
                            "column() takes a frame and a column name".to_string(),
                        ));
                    }
                };
                let series = frame.column(column).ok_or_else(|| {
                    runtime(format!(
                        "unknown column '{column}' (available: {})",
                        meridian_core::Frame::column_names().join(", ")
                    ))
                })?;
                Value::Series(series)
            }
            "mean" => {
                let value = one_arg("mean", args, line)?;
                let series = value
                    .as_series()
                    .ok_or_else(|| runtime(format!("mean() takes a series, got {}", value.type_name())))?;
                let finite: Vec<f64> = series.into_iter().filter(|v| v.is_finite()).collect();
                if finite.is_empty() {
                    return Err(runtime("mean() of an empty series".to_string()));
                }
                Value::Float(finite.iter().sum::<f64>() / finite.len() as f64)
            }
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    fn run_indicator(
        &self,
        indicator: &dyn meridian_ports::Indicator,
        name: &str,
        args: &[Value],
        line: usize,
    ) -> ExecResult<Value> {
        let series = args
            .first()
            .and_then(Value::as_series)
            .ok_or_else(|| ExecError::Runtime {
                line,
                message: format!("{name}() takes a series or frame as its first argument"),
            })?;
        let window = match args.get(1) {
            None => None,
            Some(Value::Int(i)) if *i > 0 => Some(*i as usize),
            Some(other) => {
                return Err(ExecError::Runtime {
                    line,
                    message: format!(
                        "{name}() window must be a positive integer, got {}",
                        other.type_name()
                    ),
                });
            }
        };
        let params = IndicatorParams { window };
        let computed = indicator
            .compute(&series, &params)
            .map_err(|e| compute_to_runtime(name, e, line))?;
        Ok(Value::Series(computed))
    }

    /// Map positional script arguments onto an operation's schema: the
    /// symbol comes first when the operation needs one, then the declared
    /// parameters in schema order.
    async fn run_operation(
        &self,
        operation: &str,
        args: &[Value],
        line: usize,
        corrections: &mut Vec<String>,
    ) -> ExecResult<Value> {
        let spec = self
            .gateway
            .registry()
            .resolve(operation)
            .expect("caller checked the operation exists");

        let mut request = StructuredRequest::new(operation);
        let mut positional = args.iter();

        if spec.requires_symbol {
            match positional.next() {
                Some(Value::Str(symbol)) => {
                    request.symbol = Some(symbol.clone());
                }
                Some(other) => {
                    return Err(ExecError::Runtime {
                        line,
                        message: format!(
                            "{operation}() takes a symbol string first, got {}",
                            other.type_name()
                        ),
                    });
                }
                None => {
                    return Err(ExecError::Runtime {
                        line,
                        message: format!("{operation}() requires a symbol argument"),
                    });
                }
            }
        }

        for param in &spec.params {
            let Some(value) = positional.next() else {
                break; // remaining params fall back to schema defaults
            };
            let json = value_to_param(param.kind, value).ok_or_else(|| ExecError::Runtime {
                line,
                message: format!(
                    "{operation}() argument '{}' must be a literal, got {}",
                    param.name,
                    value.type_name()
                ),
            })?;
            request.parameters.insert(param.name.to_string(), json);
        }

        if positional.next().is_some() {
            return Err(ExecError::Runtime {
                line,
                message: format!(
                    "{operation}() takes at most {} argument(s)",
                    spec.params.len() + usize::from(spec.requires_symbol)
                ),
            });
        }

        let invocation = self.gateway.invoke(&request).await?;
        corrections.extend(invocation.corrections);
        Ok(Value::from(invocation.output))
    }
}

fn compute_to_runtime(name: &str, error: ComputeError, line: usize) -> ExecError {
    let message = match error {
        ComputeError::InsufficientData {
            required,
            available,
        } => format!("{name}() needs at least {required} bars, series has {available}"),
        other => format!("{name}() failed: {other}"),
    };
    ExecError::Runtime { line, message }
}

fn one_arg<'v>(name: &str, args: &'v [Value], line: usize) -> ExecResult<&'v Value> {
    match args {
        [value] => Ok(value),
        _ => Err(ExecError::Runtime {
            line,
            message: format!("{name}() takes exactly one argument"),
        }),
    }
}

fn container_and_count<'v>(
    name: &str,
    args: &'v [Value],
    line: usize,
) -> ExecResult<(&'v Value, usize)> {
    match args {
        [value, Value::Int(n)] if *n >= 0 => Ok((value, *n as usize)),
        _ => Err(ExecError::Runtime {
            line,
            message: format!("{name}() takes a container and a non-negative count"),
        }),
    }
}

fn slice_value(name: &str, value: &Value, n: usize) -> Result<Value, String> {
    let take_tail = name == "tail";
    fn cut<E: Clone>(items: &[E], n: usize, tail: bool) -> Vec<E> {
        if tail {
            items[items.len().saturating_sub(n)..].to_vec()
        } else {
            items[..n.min(items.len())].to_vec()
        }
    }
    match value {
        Value::Series(s) => Ok(Value::Series(cut(s, n, take_tail))),
        Value::Frame(frame) => Ok(Value::Frame(meridian_core::Frame::new(cut(
            frame.bars(),
            n,
            take_tail,
        )))),
        Value::Ticks(ticks) => Ok(Value::Ticks(cut(ticks, n, take_tail))),
        Value::List(names) => Ok(Value::List(cut(names, n, take_tail))),
        other => Err(format!(
            "{name}() takes a container, got {}",
            other.type_name()
        )),
    }
}

fn value_to_param(kind: ParamKind, value: &Value) -> Option<serde_json::Value> {
    let json = match (kind, value) {
        (_, Value::Str(s)) => json!(s),
        (_, Value::Bool(b)) => json!(b),
        (ParamKind::Float, Value::Int(i)) => json!(*i as f64),
        (_, Value::Int(i)) => json!(i),
        (_, Value::Float(f)) => json!(f),
        _ => return None,
    };
    Some(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_analytics::standard_indicators;
    use meridian_connection::{ConnectionManager, RetryPolicy};
    use meridian_gateway::{Registry, SymbolCatalog};
    use meridian_terminal_sim::SimTerminal;
    use std::time::Duration;

    fn executor() -> (Arc<SimTerminal>, SandboxExecutor<SimTerminal>) {
        let _ = env_logger::try_init();
        let terminal = Arc::new(SimTerminal::with_defaults());
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&terminal),
            RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
        ));
        let catalog = Arc::new(SymbolCatalog::new(
            Arc::clone(&manager),
            Duration::from_secs(30),
        ));
        let gateway = Arc::new(OperationGateway::new(
            Registry::standard(),
            catalog,
            manager,
        ));
        (
            terminal,
            SandboxExecutor::new(gateway, standard_indicators(), ExecutorConfig::default()),
        )
    }

    #[tokio::test]
    async fn forbidden_script_never_executes() {
        let (terminal, exec) = executor();
        let err = exec
            .eval("result = copy_rates_from_pos(\"EURUSD\", \"H1\", 0, 10)\nshutdown()")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN_CONSTRUCT");
        // Rejected before any statement ran
        assert_eq!(terminal.counters().connects, 0);
        assert_eq!(terminal.counters().bars, 0);
    }

    #[tokio::test]
    async fn fetch_and_indicator_chain() {
        let (_, exec) = executor();
        let script = r#"
            bars = copy_rates_from_pos("EURUSD", "H1", 0, 100)
            closes = column(bars, "close")
            result = ta.rsi(closes, 14)
        "#;
        let outcome = exec.eval(script).await.unwrap();
        match outcome.result {
            Value::Series(series) => {
                assert_eq!(series.len(), 100);
                // Warmup positions are NaN, the rest are bounded
                assert!(series[..14].iter().all(|v| v.is_nan()));
                assert!(series[14..].iter().all(|v| (0.0..=100.0).contains(v)));
            }
            other => panic!("expected series, got {other:?}"),
        }
        assert_eq!(outcome.bindings, vec!["bars", "closes", "result"]);
    }

    #[tokio::test]
    async fn result_names_resolve_in_priority_order() {
        let (_, exec) = executor();
        let outcome = exec
            .eval("res = 1\ndata = 2\nresult = 3")
            .await
            .unwrap();
        assert_eq!(outcome.result, Value::Int(3));

        let outcome = exec.eval("res = 1\ndata = 2").await.unwrap();
        assert_eq!(outcome.result, Value::Int(2));
    }

    #[tokio::test]
    async fn bare_expression_is_not_a_result() {
        let (_, exec) = executor();
        let err = exec.eval("x = 5\nversion()").await.unwrap_err();
        match err {
            ExecError::NoResult { bindings } => assert_eq!(bindings, vec!["x"]),
            other => panic!("expected no-result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn syntax_error_reports_the_line() {
        let (_, exec) = executor();
        let err = exec.eval("x = 1\nfor i in range(10):").await.unwrap_err();
        match err {
            ExecError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undefined_variable_is_a_runtime_error() {
        let (_, exec) = executor();
        let err = exec.eval("result = tail(bars, 5)").await.unwrap_err();
        assert_eq!(err.kind(), "RUNTIME_ERROR");
        assert!(err.to_string().contains("bars"));
    }

    #[tokio::test]
    async fn insufficient_history_names_the_requirement() {
        let (_, exec) = executor();
        let script = r#"
            bars = copy_rates_from_pos("EURUSD", "H1", 0, 10)
            result = ta.rsi(column(bars, "close"), 14)
        "#;
        let err = exec.eval(script).await.unwrap_err();
        match err {
            ExecError::Runtime { message, .. } => {
                assert!(message.contains("at least"));
                assert!(message.contains("10"));
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_validation_flows_through() {
        let (_, exec) = executor();
        let err = exec
            .eval("result = copy_rates_from_pos(\"EURUSX\", \"H1\", 0, 10)")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "SYMBOL_NOT_FOUND");
        assert!(err.suggestion().unwrap().contains("EURUSD"));
    }

    #[tokio::test]
    async fn too_long_script_is_rejected_up_front() {
        let (terminal, exec) = executor();
        let long = "x = 1\n".repeat(2_000);
        let err = exec.eval(&long).await.unwrap_err();
        assert_eq!(err.kind(), "SYNTAX_ERROR");
        assert_eq!(terminal.counters().connects, 0);
    }

    #[tokio::test]
    async fn terminal_prefix_is_accepted() {
        let (_, exec) = executor();
        let outcome = exec
            .eval("result = terminal.symbols_total()")
            .await
            .unwrap();
        assert_eq!(outcome.result, Value::Int(6));
    }

    #[tokio::test]
    async fn builtins_compose() {
        let (_, exec) = executor();
        let script = r#"
            bars = copy_rates_from_pos("GBPUSD", "M15", 0, 50)
            result = mean(tail(column(bars, "close"), 10))
        "#;
        let outcome = exec.eval(script).await.unwrap();
        assert!(matches!(outcome.result, Value::Float(v) if v.is_finite() && v > 0.0));
    }
}
