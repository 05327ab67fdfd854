pub fn inspect_err(msg: &str, err: anyhow::Error) -> anyhow::Error {
    tracing::error!(msg = msg, ?err);
    err
}
