use crate::nodes::account::{AccountError, NodeAccount, Signal};

/// Shell command sending `signal` to `pid`.
#[must_use]
pub fn signal_command(pid: u32, signal: Signal) -> String {
    format!("kill -{} {pid}", signal.name())
}

/// Shell command that succeeds only while `pid` exists and is not a zombie.
#[must_use]
pub fn alive_command(pid: u32) -> String {
    format!("kill -0 {pid} 2>/dev/null && ! grep -qs '^{pid} (.*) Z ' /proc/{pid}/stat")
}

pub(crate) async fn shell_signal<A>(
    account: &A,
    pid: u32,
    signal: Signal,
) -> Result<(), AccountError>
where
    A: NodeAccount + ?Sized,
{
    account.ssh(&signal_command(pid, signal)).await
}

pub(crate) async fn shell_alive<A>(account: &A, pid: u32) -> Result<bool, AccountError>
where
    A: NodeAccount + ?Sized,
{
    match account.ssh(&alive_command(pid)).await {
        Ok(()) => Ok(true),
        Err(err) if err.is_command_failure() => Ok(false),
        Err(err) => Err(err),
    }
}
