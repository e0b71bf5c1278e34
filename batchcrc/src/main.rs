use anyhow::{anyhow, bail, Result};
use batchcrc_core::common::config::header_properties::{
    HeaderPropertySet, RecordBatchHeaderProperties, RpcHeaderProperties,
};
use clap::{App, Arg, ArgMatches};
use tracing::Level;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    match main_processor() {
        Ok(()) => info!("Exiting successfully."),
        Err(err) => {
            error!("Exiting with error: {:?}", err);
            std::process::exit(1);
        },
    }
}

fn header_subcommand(name: &'static str, about: &'static str) -> App<'static> {
    App::new(name)
        .about(about)
        .arg(
            Arg::new("INPUT")
                .help("Sets the .properties file describing the header")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("override")
                .short('o')
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Override properties defined in the input file, as key=value"),
        )
}

fn main_processor() -> Result<()> {
    let matches = App::new("batchcrc")
        .version("0.1")
        .author("Seb Ospina <kraige@gmail.com>")
        .about("Computes the header checksums of record batches and RPC frames")
        .arg(
            Arg::new("verbosity_level")
                .short('v')
                .takes_value(true)
                .default_value("info")
                .help("Sets the level of verbosity"),
        )
        .subcommand(header_subcommand("record-batch", "Checksum of a record batch header"))
        .subcommand(header_subcommand("rpc", "Checksum of an RPC header"))
        .get_matches();
    let verbosity = matches.value_of("verbosity_level").unwrap_or("info");
    let subscriber = FmtSubscriber::builder()
        // Events above `verbosity` are discarded
        .with_max_level(verbosity.parse::<Level>()?)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match matches.subcommand() {
        Some(("record-batch", sub_matches)) => {
            let header = load_properties::<RecordBatchHeaderProperties>(sub_matches)?.build()?;
            let sealed = header.seal();
            print_checksum(sealed.crc as u32, &sealed.encode_internal());
        },
        Some(("rpc", sub_matches)) => {
            let header = load_properties::<RpcHeaderProperties>(sub_matches)?.build()?;
            let sealed = header.seal();
            print_checksum(sealed.header_checksum, &sealed.encode());
        },
        _ => bail!("A subcommand is required: record-batch or rpc"),
    }
    Ok(())
}

/// Reads the INPUT file and applies the `-o key=value` overrides on top of it.
fn load_properties<P>(matches: &ArgMatches) -> Result<P>
where
    P: HeaderPropertySet + Default,
{
    let config_file = matches.value_of("INPUT").ok_or_else(|| anyhow!("Missing INPUT file"))?;
    info!("Using input file: {}", config_file);
    let mut properties = P::read_config_file(config_file)?;
    if let Some(property_overrides) = matches.values_of("override") {
        for override_property in property_overrides {
            match override_property.split_once('=') {
                Some((property_name, property_value)) => {
                    debug!("Override {} = {}", property_name, property_value);
                    properties.try_set_property(property_name, property_value)?;
                },
                None => bail!("Invalid override '{}', expected key=value", override_property),
            }
        }
    }
    Ok(properties)
}

fn print_checksum(crc: u32, encoded: &[u8]) {
    let encoded_hex: String = encoded.iter().map(|byte| format!("{:02x}", byte)).collect();
    println!("crc: {} ({:#010x})", crc, crc);
    println!("encoded: {}", encoded_hex);
}
