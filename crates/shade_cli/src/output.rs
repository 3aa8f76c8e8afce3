use serde::Serialize;

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

/// Prints `data` as a JSON envelope, or the human lines produced by `human`.
pub fn print_out<T: Serialize>(
    json: bool,
    ok: bool,
    data: &T,
    human: impl Fn(&T) -> Vec<String>,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&JsonOut { ok, data })?);
    } else {
        for line in human(data) {
            println!("{line}");
        }
    }
    Ok(())
}
