//! Output formatting for the CLI
//!
//! Every printer has a `format_*` counterpart returning the text, so the
//! layouts can be tested without capturing stdout.

use super::diff::{ColorizedDiff, DiffOptions};
use anyhow::Result;
use colored::Colorize;
use serde_json::{json, Value};
use sodalite_k8s::config::OutputFormat;
use sodalite_k8s::modules::{ModuleOutput, ModuleStatus, ValidationError};

fn status_string(status: ModuleStatus, use_color: bool) -> String {
    let text = status.to_string();
    if !use_color {
        return text;
    }
    match status {
        ModuleStatus::Ok => text.green().to_string(),
        ModuleStatus::Changed => text.yellow().to_string(),
    }
}

/// Output formatter for the selected output mode
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, format: OutputFormat) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var_os("NO_COLOR").is_none();
        Self { use_color, format }
    }

    fn serialize(&self, value: &Value) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
            OutputFormat::Yaml | OutputFormat::Human => serde_yaml::to_string(value)?,
        })
    }

    /// A rendered definition
    pub fn format_definition(&self, definition: &Value) -> Result<String> {
        self.serialize(definition)
    }

    /// Result of one module run
    pub fn format_result(&self, module: &str, output: &ModuleOutput) -> Result<String> {
        if self.format != OutputFormat::Human {
            let value = json!({
                "module": module,
                "changed": output.changed,
                "status": output.status,
                "msg": output.msg,
                "diff": output.diff,
                "data": output.data,
            });
            return self.serialize(&value);
        }

        let mut text = format!(
            "{}: [{}] {}\n",
            status_string(output.status, self.use_color),
            module,
            output.msg
        );
        if let Some(diff) = &output.diff {
            let printer = ColorizedDiff::with_options(DiffOptions {
                use_color: self.use_color,
                ..DiffOptions::default()
            });
            let summary = printer.summary(&diff.before, &diff.after);
            text.push_str(&printer.render(diff, module));
            text.push_str(&format!("({})\n", summary.format(self.use_color)));
        }
        Ok(text)
    }

    /// Outcome of a validation run; `errors` is empty on success
    pub fn format_validation(&self, module: &str, errors: &[ValidationError]) -> Result<String> {
        if self.format != OutputFormat::Human {
            let errors: Vec<Value> = errors
                .iter()
                .map(|e| json!({"field": e.field, "message": e.message}))
                .collect();
            return self.serialize(&json!({
                "module": module,
                "valid": errors.is_empty(),
                "errors": errors,
            }));
        }

        if errors.is_empty() {
            return Ok(if self.use_color {
                format!("{}\n", "ok".green())
            } else {
                "ok\n".to_string()
            });
        }
        let prefix = if self.use_color {
            "ERROR:".red().bold().to_string()
        } else {
            "ERROR:".to_string()
        };
        Ok(errors
            .iter()
            .map(|e| format!("{} {}\n", prefix, e.message))
            .collect())
    }

    /// Registered modules and their descriptions
    pub fn format_modules(&self, modules: &[(&str, &str)]) -> Result<String> {
        if self.format != OutputFormat::Human {
            let list: Vec<Value> = modules
                .iter()
                .map(|(name, description)| json!({"name": name, "description": description}))
                .collect();
            return self.serialize(&Value::Array(list));
        }

        let rows: Vec<Vec<String>> = modules
            .iter()
            .map(|(name, description)| vec![name.to_string(), description.to_string()])
            .collect();
        Ok(self.table(&["MODULE", "DESCRIPTION"], &rows))
    }

    /// Plain text table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let line = |cells: Vec<&str>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header = line(headers.to_vec());
        let mut out = if self.use_color {
            format!("{}\n", header.bright_white().bold())
        } else {
            format!("{}\n", header)
        };
        for row in rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
            out.push('\n');
        }
        out
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.format == OutputFormat::Json {
            eprintln!("{}", json!({"type": "error", "message": message}));
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sodalite_k8s::modules::Diff;

    fn plain(format: OutputFormat) -> OutputFormatter {
        OutputFormatter::new(false, format)
    }

    #[test]
    fn test_definition_formats() {
        let definition = json!({"apiVersion": "v1", "kind": "Namespace"});
        assert_eq!(
            plain(OutputFormat::Yaml).format_definition(&definition).unwrap(),
            "apiVersion: v1\nkind: Namespace\n"
        );
        let json_text = plain(OutputFormat::Json).format_definition(&definition).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json_text).unwrap(), definition);
    }

    #[test]
    fn test_validation_human() {
        let out = plain(OutputFormat::Human).format_validation("k8s_namespace", &[]).unwrap();
        assert_eq!(out, "ok\n");

        let errors = vec![
            ValidationError::new("name", "'name' is bad"),
            ValidationError::new("labels", "labels are bad"),
        ];
        let out = plain(OutputFormat::Human)
            .format_validation("k8s_namespace", &errors)
            .unwrap();
        assert_eq!(out, "ERROR: 'name' is bad\nERROR: labels are bad\n");
    }

    #[test]
    fn test_validation_json() {
        let errors = vec![ValidationError::new("name", "'name' is bad")];
        let out = plain(OutputFormat::Json)
            .format_validation("k8s_namespace", &errors)
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["valid"], json!(false));
        assert_eq!(value["errors"][0]["field"], json!("name"));
    }

    #[test]
    fn test_result_with_diff() {
        let output = ModuleOutput::changed("Created Namespace 'foo'")
            .with_diff(Diff::new("", "kind: Namespace\n"));
        let out = plain(OutputFormat::Human)
            .format_result("k8s_namespace", &output)
            .unwrap();
        assert!(out.starts_with("changed: [k8s_namespace] Created Namespace 'foo'\n"));
        assert!(out.contains("+kind: Namespace"));
        assert!(out.ends_with("(+1)\n"));
    }

    #[test]
    fn test_modules_table() {
        let out = plain(OutputFormat::Human)
            .format_modules(&[("k8s_pvc", "Manage PVCs"), ("k8s_namespace", "Manage Namespaces")])
            .unwrap();
        assert_eq!(
            out,
            "MODULE         DESCRIPTION\nk8s_pvc        Manage PVCs\nk8s_namespace  Manage Namespaces\n"
        );
    }
}
