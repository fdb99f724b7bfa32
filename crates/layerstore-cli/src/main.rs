//! Command-line interface for `layerstore`, a feature query engine for GIS layers.
//!
//! This binary serves the feature operations of [`layerstore_core`] over local
//! `GeoJSON` files: every `--layer FILE` becomes a feature layer, numbered from
//! 1 in argument order.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! It parses arguments, configures logging, assembles a `FeatureService` and
//! delegates to command handlers. Library crates log through the `log` facade,
//! bridged into `tracing`.
//!
//! # Available Commands
//!
//! - `layers` - List the loaded layers and their query capabilities
//! - `fields` - List the field descriptors of a layer
//! - `store` - List features with pagination, projection and filters
//! - `item` - Fetch one feature, optionally with its box and extension data
//! - `show` - Print a compact summary of one feature
//! - `identify` - Find features intersecting a geometry across layers
//! - `settings` - Print the client capability descriptor
//! - `widget` - Print the composite feature edit widget of a layer
//! - `edit-fields` - Apply a field descriptor edit to a layer

mod context;
mod display;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use layerstore_common::LayerFieldsPatch;
use layerstore_core::identify::IdentifyRequest;
use layerstore_core::{ItemRequest, LayerStoreError, Principal, StoreRequest};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use crate::context::{ServiceContext, ServiceOptions};

#[derive(Parser)]
#[command(
    name = "layerstore",
    version,
    about = "Feature queries, pagination and identify over GIS layers",
    long_about = "layerstore serves feature listings, single features, field descriptors\n\
                  and multi-layer identify over GeoJSON layers."
)]
/// Command-line arguments and options for the `layerstore` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    /// `GeoJSON` file to serve as a layer; repeat for more layers.
    #[arg(long = "layer", value_name = "FILE", global = true)]
    layers: Vec<PathBuf>,

    /// Remove read permission on a layer id; repeat for more layers.
    #[arg(long, value_name = "ID", global = true)]
    deny: Vec<i64>,

    /// Component settings file (JSON).
    #[arg(long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Keyed extension data file (JSON): `{identity: {layer id: {feature id: value}}}`.
    #[arg(long, value_name = "FILE", global = true)]
    ext_data: Option<PathBuf>,

    /// Act as this user instead of the guest.
    #[arg(long, value_name = "NAME", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `layerstore` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Lists the loaded layers and their query capabilities.
    Layers,

    /// Lists the field descriptors of a layer in display order.
    Fields {
        /// Layer id.
        layer: i64,
    },

    /// Lists features of a layer.
    ///
    /// The content range of a paginated listing is written to standard error.
    Store {
        /// Layer id.
        layer: i64,

        /// Window as `items=<first>-<last>`, zero-based and inclusive.
        #[arg(long, value_name = "RANGE")]
        range: Option<String>,

        /// Fields to return, as a JSON array of strings.
        #[arg(long, value_name = "JSON")]
        fields: Option<String>,

        /// Prefix for returned field keys, as a JSON string.
        #[arg(long, value_name = "JSON")]
        prefix: Option<String>,

        /// Include each feature's bounding box.
        #[arg(long = "box")]
        with_box: bool,

        /// Only features whose label or text fields contain this substring.
        #[arg(long, value_name = "TEXT")]
        like: Option<String>,
    },

    /// Fetches one feature with all its fields.
    Item {
        /// Layer id.
        layer: i64,

        /// Feature id.
        feature: i64,

        /// Include the feature's bounding box.
        #[arg(long = "box")]
        with_box: bool,

        /// Include extension data.
        #[arg(long)]
        ext: bool,
    },

    /// Prints the id, label and fields of one feature.
    Show {
        /// Layer id.
        layer: i64,

        /// Feature id.
        feature: i64,
    },

    /// Finds features intersecting a geometry across layers.
    Identify {
        /// Spatial reference id of the geometry.
        #[arg(long, default_value = "4326")]
        srs: String,

        /// Geometry as well-known text.
        #[arg(long, value_name = "WKT")]
        geom: String,

        /// Layer ids to search, comma separated.
        #[arg(long = "layers", value_name = "IDS", value_delimiter = ',', required = true)]
        layer_ids: Vec<String>,
    },

    /// Prints the client capability descriptor.
    Settings,

    /// Prints the composite feature edit widget of a layer.
    Widget {
        /// Layer id.
        layer: i64,
    },

    /// Applies a field descriptor edit and prints the resulting fields.
    EditFields {
        /// Layer id.
        layer: i64,

        /// Edit as JSON: `{"feature_label_field_id": 1, "fields": [{"id": 2, "display_name": "..."}]}`.
        #[arg(long, value_name = "JSON")]
        patch: String,
    },
}

/// Entry point for the `layerstore` command-line interface.
///
/// # Errors
///
/// Returns an error if a layer cannot be loaded, the command fails, or the
/// logging system cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let options = ServiceOptions {
        layers: cli.layers,
        deny: cli.deny,
        settings: cli.settings,
        ext_data: cli.ext_data,
    };
    let ctx = context::build(&options).await?;
    let principal = cli.user.map_or(Principal::Guest, Principal::User);

    match cli.command {
        Commands::Layers => handle_layers(&ctx),
        Commands::Fields { layer } => handle_fields(&ctx, &principal, layer),
        Commands::Store {
            layer,
            range,
            fields,
            prefix,
            with_box,
            like,
        } => {
            let request = StoreRequest {
                range,
                field_list: fields,
                field_prefix: prefix,
                feature_box: with_box,
                like,
            };
            handle_store(&ctx, &principal, layer, &request).await
        },
        Commands::Item {
            layer,
            feature,
            with_box,
            ext,
        } => {
            let request = ItemRequest {
                feature_box: with_box,
                feature_ext: ext,
            };
            let item = ctx
                .service
                .get_feature(&principal, layer, feature, request)
                .await
                .map_err(report)?;
            display::print_json(&item)
        },
        Commands::Show { layer, feature } => {
            let summary = ctx
                .service
                .show_feature(&principal, layer, feature)
                .await
                .map_err(report)?;
            display::print_json(&summary)
        },
        Commands::Identify {
            srs,
            geom,
            layer_ids,
        } => handle_identify(&ctx, &principal, srs, geom, layer_ids).await,
        Commands::Settings => display::print_json(&ctx.service.client_settings()),
        Commands::Widget { layer } => {
            let widget = ctx
                .service
                .compose_edit_widget(&principal, layer)
                .map_err(report)?;
            display::print_json(&widget)
        },
        Commands::EditFields { layer, patch } => handle_edit_fields(&ctx, &principal, layer, &patch),
    }
}

/// Turns a service error into a CLI error carrying its recovery hint.
fn report(err: LayerStoreError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow!("{}\nHint: {hint}", err.user_message()),
        None => anyhow!(err.user_message()),
    }
}

#[allow(clippy::unnecessary_wraps)] // Same signature as the other handlers
fn handle_layers(ctx: &ServiceContext) -> Result<()> {
    println!("\nLayers ({} total):\n", ctx.layers.len());
    println!("{}", display::layer_table(&ctx.layers));
    Ok(())
}

fn handle_fields(ctx: &ServiceContext, principal: &Principal, layer_id: i64) -> Result<()> {
    let fields = ctx
        .service
        .field_collection(principal, layer_id)
        .map_err(report)?;
    let label_field = ctx
        .service
        .layer(layer_id)?
        .as_feature_layer()
        .and_then(|layer| layer.feature_label_field_id());
    println!("{}", display::field_table(&fields, label_field));
    Ok(())
}

async fn handle_store(
    ctx: &ServiceContext,
    principal: &Principal,
    layer_id: i64,
    request: &StoreRequest,
) -> Result<()> {
    let response = ctx
        .service
        .list_features(principal, layer_id, request)
        .await
        .map_err(report)?;
    if let Some(range) = response.content_range {
        eprintln!("Content-Range: {range}");
    }
    display::print_json(&response.body())
}

async fn handle_identify(
    ctx: &ServiceContext,
    principal: &Principal,
    srs: String,
    geom: String,
    layer_ids: Vec<String>,
) -> Result<()> {
    let body = json!({ "srs": srs, "geom": geom, "layers": layer_ids });
    let request = IdentifyRequest::from_json(&body).map_err(|e| report(e.into()))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling identify");
            on_interrupt.cancel();
        }
    });

    let result = ctx
        .service
        .identify(principal, &request, &cancel)
        .await
        .map_err(report)?;
    info!("Identify returned {} feature(s)", result.feature_count);
    display::print_json(&result)
}

fn handle_edit_fields(
    ctx: &ServiceContext,
    principal: &Principal,
    layer_id: i64,
    patch: &str,
) -> Result<()> {
    let patch: LayerFieldsPatch =
        serde_json::from_str(patch).map_err(|e| anyhow!("Invalid field edit: {e}"))?;
    ctx.service
        .update_fields(principal, layer_id, &patch)
        .map_err(report)?;
    handle_fields(ctx, principal, layer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use layerstore_core::AccessError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_appends_recovery_hint() {
        let err = report(
            AccessError::NotImplemented {
                layer_id: 2,
                capability: "feature layer",
            }
            .into(),
        );
        assert_eq!(
            err.to_string(),
            "Layer 2 does not provide feature layer\nHint: Use a layer that stores features."
        );

        let err = report(AccessError::LayerNotFound { layer_id: 9 }.into());
        assert_eq!(err.to_string(), "Layer 9 not found");
    }

    #[test]
    fn identify_layers_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "layerstore",
            "--layer",
            "a.geojson",
            "identify",
            "--geom",
            "POINT (0 0)",
            "--layers",
            "1,2",
        ])
        .unwrap();
        match cli.command {
            Commands::Identify { srs, layer_ids, .. } => {
                assert_eq!(srs, "4326");
                assert_eq!(layer_ids, vec!["1", "2"]);
            },
            _ => panic!("expected identify"),
        }
    }
}
