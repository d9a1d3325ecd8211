//! Built-in placeholder operators: `ref`, `env`, `import`, `global`.

use crate::error::{ConfigError, Result};
use crate::registry::Operator;
use crate::resolver::ResolutionContext;
use strata_value::{ConfigPath, OperatorCall, Scalar, Value, ValueError, access};

fn expect_args(call: &OperatorCall, min: usize, max: usize) -> Result<()> {
    if call.args.len() < min || call.args.len() > max {
        return Err(ValueError::syntax(
            call.to_string(),
            format!("'{}' takes {} to {} arguments", call.name, min, max),
        )
        .into());
    }
    Ok(())
}

/// `{ref:path}` / `{ref:path, default}`: look up another value.
///
/// The target resolves recursively, so references compose. The default
/// applies only when the path is not found; a mandatory-marker or cycle
/// error at the target propagates.
pub struct RefOperator;

impl Operator for RefOperator {
    fn name(&self) -> &'static str {
        "ref"
    }

    fn resolve(&self, call: &OperatorCall, ctx: &mut ResolutionContext<'_>) -> Result<Value> {
        expect_args(call, 1, 2)?;
        let text = ctx.argument_text(&call.args[0])?;
        let path = ConfigPath::parse(&text)?;
        match ctx.lookup(&path) {
            Err(ConfigError::NotFound { .. }) if call.args.len() == 2 => {
                ctx.resolve_argument(&call.args[1])
            }
            other => other,
        }
    }
}

/// `{env:NAME}` / `{env:NAME, default}`: read an environment variable.
///
/// The variable's value is always a final string literal; it is never
/// scanned for further placeholders, so an environment value cannot inject
/// references into the document.
pub struct EnvOperator;

impl Operator for EnvOperator {
    fn name(&self) -> &'static str {
        "env"
    }

    fn resolve(&self, call: &OperatorCall, ctx: &mut ResolutionContext<'_>) -> Result<Value> {
        expect_args(call, 1, 2)?;
        let name = ctx.argument_text(&call.args[0])?;
        match std::env::var(&name) {
            Ok(text) => Ok(Value::Scalar(Scalar::Str(text))),
            Err(_) if call.args.len() == 2 => ctx.resolve_argument(&call.args[1]),
            Err(_) => Err(ConfigError::not_found(format!("env:{}", name))),
        }
    }
}

/// `{import:locator}` / `{import:locator, true}`: splice another document.
///
/// The locator may itself contain placeholders. The optional boolean picks
/// merge placement: `true` merges the imported tree into the enclosing
/// file's root and removes this node, `false` (default) loads in place.
pub struct ImportOperator;

impl Operator for ImportOperator {
    fn name(&self) -> &'static str {
        "import"
    }

    fn resolve(&self, call: &OperatorCall, ctx: &mut ResolutionContext<'_>) -> Result<Value> {
        expect_args(call, 1, 2)?;
        let locator = ctx.argument_text(&call.args[0])?;
        let merge = match call.args.get(1) {
            None => false,
            Some(arg) => match ctx.resolve_argument(arg)? {
                Value::Scalar(Scalar::Bool(b)) => b,
                _ => {
                    return Err(ValueError::syntax(
                        call.to_string(),
                        "import merge flag must be a boolean",
                    )
                    .into());
                }
            },
        };
        ctx.import(&locator, merge)
    }
}

/// `{global:path}` / `{global:path, default}`: look up the per-document
/// global table instead of the document tree.
///
/// Globals hold plain values supplied through the owning config's API, so
/// the lookup is a pure tree walk with no further resolution.
pub struct GlobalOperator;

impl Operator for GlobalOperator {
    fn name(&self) -> &'static str {
        "global"
    }

    fn resolve(&self, call: &OperatorCall, ctx: &mut ResolutionContext<'_>) -> Result<Value> {
        expect_args(call, 1, 2)?;
        let text = ctx.argument_text(&call.args[0])?;
        let path = ConfigPath::parse(&text)?;
        let found = access::get(&ctx.state.globals, &path)?.cloned();
        match found {
            Some(value) => Ok(value),
            None if call.args.len() == 2 => ctx.resolve_argument(&call.args[1]),
            None => Err(ConfigError::not_found(format!("global:{}", path))),
        }
    }
}
