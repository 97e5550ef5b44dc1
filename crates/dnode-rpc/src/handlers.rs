//! Demo methods exposed on every connection.

use dnode_core::{Arguments, Callback, DnodeError, Dnode, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between countdown ticks.
const COUNTDOWN_TICK: Duration = Duration::from_millis(100);

/// Register every demo method on `dnode`.
pub fn register(dnode: &Dnode) {
    dnode.handle_func("ping", Callback::from_fn(ping));
    dnode.handle_func("echo", Callback::from_fn(echo));
    dnode.handle_func("countdown", Callback::from_fn(countdown));
}

/// `ping(cb)`: calls `cb("pong")`.
async fn ping(args: Arguments) -> dnode_core::Result<()> {
    let reply = args.callback(0)?;
    reply.call(vec![Value::from("pong")]).await
}

/// `echo(...values, cb)`: calls `cb(...values)`.
async fn echo(args: Arguments) -> dnode_core::Result<()> {
    let mut values = args.into_vec();
    let reply = match values.pop() {
        Some(Value::Function(cb)) => cb,
        _ => {
            return Err(DnodeError::invalid_arguments(
                "echo expects a callback as its last argument",
            ))
        }
    };
    reply.call(values).await
}

/// `countdown(n, cb)`: calls `cb(n)`, `cb(n - 1)`, ... `cb(0)`, one tick
/// apart, without holding up the connection.
async fn countdown(args: Arguments) -> dnode_core::Result<()> {
    let from = args.u64(0)?;
    let tick = args.callback(1)?;

    tokio::spawn(async move {
        for n in (0..=from).rev() {
            if let Err(e) = tick.call(vec![Value::from(n)]).await {
                warn!("Countdown stopped at {}: {}", n, e);
                return;
            }
            if n > 0 {
                tokio::time::sleep(COUNTDOWN_TICK).await;
            }
        }
        debug!("Countdown from {} finished", from);
    });

    Ok(())
}
