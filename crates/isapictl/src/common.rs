use std::path::Path;

use anyhow::{Context, Result};
use isapi::QueryResult;
use serde::Serialize;

/// Hints printed after a failed query.
pub const SUGGESTIONS: [&str; 5] = [
    "Verifique que la IP y el puerto son correctos",
    "Compruebe las credenciales de usuario y contraseña",
    "Asegúrese de que el dispositivo es accesible en la red",
    "Pruebe con diferentes puertos (80, 8000)",
    "Verifique si el dispositivo requiere HTTPS en lugar de HTTP",
];

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

pub fn save_result(result: &QueryResult, path: &Path) -> Result<()> {
    isapi::save_result(result, path).with_context(|| format!("write {}", path.display()))
}

/// Error block shown for a [`QueryResult::Failure`].
pub fn failure_report(message: &str, details: Option<&str>) -> String {
    let mut lines = vec![format!("Error: {message}")];
    if let Some(details) = details {
        lines.push(format!("Detalles: {details}"));
    }
    lines.push(String::new());
    lines.push("Sugerencias:".to_string());
    lines.extend(
        SUGGESTIONS
            .iter()
            .enumerate()
            .map(|(idx, hint)| format!("{}. {hint}", idx + 1)),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_report_lists_suggestions() {
        let report = failure_report("HTTP error: 401", Some("Unauthorized"));
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines[0], "Error: HTTP error: 401");
        assert_eq!(lines[1], "Detalles: Unauthorized");
        assert_eq!(lines[3], "Sugerencias:");
        assert_eq!(lines.len(), 9);
        assert!(lines[8].starts_with("5. "));
    }

    #[test]
    fn failure_report_without_details() {
        let report = failure_report("connection error: refused", None);
        assert!(!report.contains("Detalles"));
        assert!(report.starts_with("Error: connection error: refused\n\nSugerencias:"));
    }
}
