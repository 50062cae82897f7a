//! Sandbox provisioning.
//!
//! Every library is evaluated as a factory and called with the private host
//! object. The `pm` bootstrap then installs the script-visible globals.

use boa_engine::{Context, JsResult, JsValue, Source};

use super::bridge::{Bridge, host_object};
use super::convert::type_error;
use super::libraries;

const PM: &str = include_str!("js/pm.js");

/// Installs `pm`, `console`, the libraries and the `require` shim.
pub(crate) fn provision(ctx: &mut Context, bridge: &Bridge) -> JsResult<()> {
    let host = JsValue::from(host_object(ctx, bridge));

    let crypto = instantiate(ctx, libraries::CRYPTO_JS, &[host.clone()])?;
    let lodash = instantiate(ctx, libraries::LODASH, &[])?;
    let moment = instantiate(ctx, libraries::MOMENT, &[host.clone()])?;
    let expect = instantiate(ctx, libraries::EXPECT, &[])?;
    instantiate(ctx, PM, &[host, crypto, lodash, moment, expect])?;
    Ok(())
}

fn instantiate(ctx: &mut Context, source: &str, args: &[JsValue]) -> JsResult<JsValue> {
    let factory = ctx.eval(Source::from_bytes(source))?;
    let factory = factory
        .as_callable()
        .ok_or_else(|| type_error("library source did not evaluate to a factory"))?;
    factory.call(&JsValue::undefined(), args, ctx)
}
