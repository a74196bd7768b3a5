use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use record_upgrade::{
    validate_catalog, MapContext, Record, SchemaCatalog, StepRegistry, Upgrader, VersionedRecord,
    LEGACY_VERSION_FIELD,
};
use serde_json::Value;
use tracing::debug;

/// Arguments of `rup upgrade`.
pub struct UpgradeArgs<'a> {
    pub file: &'a Path,
    pub type_name: &'a str,
    pub from: Option<u32>,
    pub to: Option<u32>,
    pub catalog: Option<&'a Path>,
    pub context: Option<&'a Path>,
    pub compact: bool,
}

/// `rup upgrade <file> --type T`: Upgrade one record and print the envelope.
pub fn upgrade(args: UpgradeArgs<'_>) -> Result<()> {
    let catalog = load_catalog(args.catalog)?;
    let upgrader = Upgrader::new(donor_upgrades::registry()?);

    let value = read_json(args.file)?;
    let envelope = into_envelope(value, args.type_name, args.from)?;

    let to_version = match args.to {
        Some(v) => v,
        None => catalog
            .current_version(args.type_name)
            .ok_or_else(|| anyhow!("type `{}` is not in the catalog; pass --to", args.type_name))?,
    };

    let ctx = match args.context {
        Some(path) => load_context(path)?,
        None => MapContext::new(),
    };
    debug!(references = ctx.len(), "context loaded");

    let upgraded = upgrader.upgrade(
        args.type_name,
        &envelope.properties,
        envelope.schema_version,
        to_version,
        &ctx,
    )?;

    if upgraded.applied.is_empty() {
        eprintln!("{} already at v{to_version}", args.type_name);
    }
    for step in &upgraded.applied {
        eprintln!(
            "  v{} -> v{}  {}",
            step.source_version,
            step.source_version + 1,
            step.name
        );
    }

    let out = VersionedRecord::new(args.type_name, upgraded.version, upgraded.record);
    let json = if args.compact {
        serde_json::to_string(&out)?
    } else {
        serde_json::to_string_pretty(&out)?
    };
    println!("{json}");
    Ok(())
}

/// `rup chain --type T`: List registered steps and report gaps.
pub fn chain(type_name: &str, catalog_path: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let registry = donor_upgrades::registry()?;

    let steps = registry.registered_steps(type_name);
    if steps.is_empty() {
        bail!("no upgrade steps registered for `{type_name}`");
    }

    println!("Type: {type_name}");
    if let Some(entry) = catalog.entry(type_name) {
        println!(
            "Catalog: current v{}, oldest supported v{}",
            entry.current_version, entry.min_version
        );
    }
    println!();
    println!("  {:>6} {:>6}  {}", "From", "To", "Step");
    println!("  {}", "-".repeat(48));
    for step in &steps {
        println!(
            "  {:>6} {:>6}  {}",
            format!("v{}", step.source_version),
            format!("v{}", step.target_version),
            step.name
        );
    }
    println!("  {}", "-".repeat(48));
    println!("  {} steps", steps.len());
    println!();

    let (first, last) = match catalog.entry(type_name) {
        Some(entry) => (entry.min_version, entry.current_version),
        None => (
            steps[0].source_version,
            steps[steps.len() - 1].target_version,
        ),
    };
    let gaps = find_gaps(&registry, type_name, first, last);
    if gaps.is_empty() {
        println!("Chain complete: v{first} -> v{last}");
        return Ok(());
    }
    for version in &gaps {
        eprintln!("  gap: no step from v{version} to v{}", version + 1);
    }
    bail!("{} gap(s) in the `{type_name}` chain", gaps.len())
}

/// `rup check`: Validate a catalog against the built-in registry.
pub fn check(catalog_path: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let registry = donor_upgrades::registry()?;

    if let Err(issues) = validate_catalog(&catalog, &registry) {
        for issue in &issues {
            eprintln!("  {issue}");
        }
        bail!("catalog has {} issue(s)", issues.len());
    }

    for type_name in catalog.types() {
        if let Some(entry) = catalog.entry(type_name) {
            println!(
                "  ok  {:<20} v{} -> v{}",
                type_name, entry.min_version, entry.current_version
            );
        }
    }
    for type_name in registry.type_names() {
        if catalog.entry(type_name).is_none() {
            println!("  --  {type_name:<20} registered but not catalogued");
        }
    }
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<SchemaCatalog> {
    match path {
        Some(path) => SchemaCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => Ok(donor_upgrades::catalog()),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Accepts an envelope, a legacy record with an inline `schema_version`, or
/// a bare record together with `--from`.
fn into_envelope(value: Value, type_name: &str, from: Option<u32>) -> Result<VersionedRecord> {
    let Value::Object(object) = value else {
        bail!("expected a JSON object");
    };

    if object.contains_key("properties") && object.contains_key("type") {
        let envelope: VersionedRecord = serde_json::from_value(Value::Object(object))
            .context("reading record envelope")?;
        if envelope.type_name != type_name {
            bail!(
                "envelope holds a `{}` record, not `{type_name}`",
                envelope.type_name
            );
        }
        if let Some(from) = from {
            if from != envelope.schema_version {
                bail!(
                    "--from {from} contradicts the envelope's schema_version {}",
                    envelope.schema_version
                );
            }
        }
        return Ok(envelope);
    }

    match from {
        Some(from) => {
            let mut properties: Record = object;
            properties.remove(LEGACY_VERSION_FIELD);
            Ok(VersionedRecord::new(type_name, from, properties))
        }
        None if object.contains_key(LEGACY_VERSION_FIELD) => {
            Ok(VersionedRecord::from_legacy(type_name, object)?)
        }
        None => bail!("bare record has no `{LEGACY_VERSION_FIELD}`; pass --from"),
    }
}

fn load_context(path: &Path) -> Result<MapContext> {
    let Value::Object(entries) = read_json(path)? else {
        bail!("context file {} must hold a JSON object", path.display());
    };
    let mut ctx = MapContext::new();
    for (reference, record) in entries {
        match record {
            Value::Object(record) => ctx.insert(reference, record),
            _ => bail!("context entry `{reference}` is not a record"),
        }
    }
    Ok(ctx)
}

fn find_gaps(registry: &StepRegistry, type_name: &str, first: u32, last: u32) -> Vec<u32> {
    (first..last)
        .filter(|v| registry.lookup(type_name, *v).is_none())
        .collect()
}
