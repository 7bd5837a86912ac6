use anyhow::{anyhow, bail, Context, Result};
use partlib_params::{Declaration, ParameterSet, RawValue};
use std::fs;
use std::path::Path;

/// Read a declaration from a `.json` or `.toml` file
pub fn read_declaration(path: &Path) -> Result<Declaration> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read declaration {}", path.display()))?;

    let value: RawValue = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        Some("toml") => {
            let table: toml::Value = toml::from_str(&text)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?;
            serde_json::to_value(table)?
        }
        Some(other) => bail!("Unsupported declaration format '.{other}': {}", path.display()),
        None => bail!("Declaration file has no extension: {}", path.display()),
    };

    Declaration::from_value(value)
        .with_context(|| format!("Invalid declaration {}", path.display()))
}

/// Build the parameter set of every file and merge them left to right
pub fn load_parameter_set(paths: &[impl AsRef<Path>]) -> Result<ParameterSet> {
    let mut merged: Option<ParameterSet> = None;
    for path in paths {
        let path = path.as_ref();
        let declaration = read_declaration(path)?;
        let params = ParameterSet::new(&declaration)
            .with_context(|| format!("Invalid parameters in {}", path.display()))?;
        log::debug!(
            "Loaded {} ({} parameters)",
            path.display(),
            params.parameters().len()
        );

        merged = Some(match merged {
            None => params,
            Some(acc) => acc
                .union(&params)
                .with_context(|| format!("Cannot merge {}", path.display()))?,
        });
    }
    merged.ok_or_else(|| anyhow!("No declaration files given"))
}
