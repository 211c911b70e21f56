use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use redcap_api::{ClientSettings, Endpoint, ExportRequest, OverwriteBehavior, RedcapClient};
use redcap_cli::logging::redact_value;
use redcap_cli::output::{has_required, read_records, write_csv, write_json};
use redcap_model::{Metadata, TypingPolicy};
use tracing::{Instrument, info, info_span, trace};

use crate::cli::{ConnectionArgs, ExportArgs, ImportArgs, MetadataArgs, OutputFormatArg};
use crate::summary::print_metadata;

fn client(args: &ConnectionArgs) -> Result<RedcapClient> {
    let settings = ClientSettings::default()
        .with_max_chunk_size(args.chunk_size)
        .with_parallel_calls(args.parallel)
        .with_ssl_verify(!args.insecure)
        .with_request_timeout(args.timeout.map(Duration::from_secs));
    let endpoint = Endpoint::new(args.url.clone(), args.token.clone());
    RedcapClient::new(endpoint, settings).context("configure client")
}

fn typing_policy(legacy: bool) -> TypingPolicy {
    if legacy {
        TypingPolicy::Legacy
    } else {
        TypingPolicy::FixedVocabulary
    }
}

fn export_request(args: &ExportArgs) -> ExportRequest {
    let mut request = ExportRequest::new();
    if let Some(id_var) = &args.id_var {
        request = request.with_id_var(id_var.clone());
    }
    if !args.ids.is_empty() {
        request = request.with_ids(args.ids.clone());
    }
    if !args.fields.is_empty() {
        request = request.with_variables(args.fields.clone());
    }
    if !args.forms.is_empty() {
        request = request.with_forms(args.forms.clone());
    }
    if !args.events.is_empty() {
        request = request.with_events(args.events.clone());
    }
    if !args.require.is_empty() {
        let required = args.require.clone();
        let id_var = args.id_var.clone().unwrap_or_default();
        request = request.with_filter(args.require.clone(), move |record| {
            let keep = has_required(record, &required);
            if !keep {
                let id = record.get(&id_var).map_or("", String::as_str);
                trace!(record = redact_value(id), "dropping record missing required fields");
            }
            keep
        });
    }
    request
}

pub async fn run_export(args: &ExportArgs) -> Result<()> {
    let span = info_span!("export", url = %args.connection.url);
    export(args).instrument(span).await
}

async fn export(args: &ExportArgs) -> Result<()> {
    let started = Instant::now();
    let client = client(&args.connection)?;
    let request = export_request(args);

    let metadata: Option<Metadata> = if args.typed {
        Some(
            client
                .export_metadata(typing_policy(args.legacy_types))
                .await
                .context("export metadata")?,
        )
    } else {
        None
    };

    let output = args.output.as_deref();
    let records = match (args.format, &metadata) {
        (OutputFormatArg::Json, None) => {
            let records = client.export_records(&request).await.context("export records")?;
            write_json(&records, output)?;
            records.len()
        }
        (OutputFormatArg::Json, Some(metadata)) => {
            let rows = client
                .export_typed(&request, metadata)
                .await
                .context("export records")?;
            write_json(&rows, output)?;
            rows.len()
        }
        (OutputFormatArg::Csv, None) => {
            let mut table = client.export_table(&request).await.context("export records")?;
            write_csv(&mut table, output)?;
            table.height()
        }
        (OutputFormatArg::Csv, Some(metadata)) => {
            let mut table = client
                .export_typed_table(&request, metadata)
                .await
                .context("export records")?;
            write_csv(&mut table, output)?;
            table.height()
        }
    };

    info!(
        records,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "export finished"
    );
    if let Some(path) = output {
        eprintln!("Exported {records} records to {}", path.display());
    }
    Ok(())
}

pub async fn run_metadata(args: &MetadataArgs) -> Result<()> {
    let client = client(&args.connection)?;
    let metadata = client
        .export_metadata(typing_policy(args.legacy_types))
        .await
        .context("export metadata")?;
    print_metadata(&metadata, args.expand);
    Ok(())
}

pub async fn run_import(args: &ImportArgs) -> Result<()> {
    let span = info_span!("import", input = %args.input.display());
    import(args).instrument(span).await
}

async fn import(args: &ImportArgs) -> Result<()> {
    let rows = read_records(&args.input)?;
    let client = client(&args.connection)?;
    let overwrite = if args.overwrite {
        OverwriteBehavior::Overwrite
    } else {
        OverwriteBehavior::Normal
    };

    let count = client
        .import(&rows, overwrite)
        .await
        .context("import records")?;
    println!("Imported {count} of {} records", rows.len());
    Ok(())
}
