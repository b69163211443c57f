use std::path::{Path, PathBuf};
use std::process::ExitCode;

use api_shared::responses::to_json_indented;
use api_shared::{CdaErrorBody, HealthService, InvalidHl7Body};
use clap::{Parser, Subcommand};
use interop_core::{
    ConversionRequest, ConversionResult, ConversionService, CoreConfig, FailureClass,
    SourceFormat,
};

#[derive(Parser)]
#[command(name = "interop")]
#[command(about = "CDA to FHIR converter and HL7 lab checker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the converters are available
    Health,
    /// Convert a C-CDA document into a FHIR Bundle
    Cda2fhir {
        /// Path to the C-CDA XML file
        file: PathBuf,
        /// Document template (CCD, DischargeSummary, ReferralNote, ProgressNote)
        #[arg(long, default_value = "CCD")]
        document_type: fhir::DocumentType,
    },
    /// Check and parse an HL7 v2 message
    Labcheck {
        /// Path to the HL7 message file
        file: PathBuf,
    },
    /// Report whether an HL7 v2 message is structurally valid
    Validate {
        /// Path to the HL7 message file
        file: PathBuf,
    },
}

fn upload(source_format: SourceFormat, file: &Path) -> Result<ConversionRequest, String> {
    let bytes = std::fs::read(file).map_err(|e| format!("{}: {}", file.display(), e))?;
    ConversionRequest::from_upload(source_format, Some(bytes)).map_err(|missing| missing.error)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Health) => {
            let health = HealthService::check_health();
            println!("{}", health.message);
        }
        Some(Commands::Cda2fhir {
            file,
            document_type,
        }) => {
            let cfg = CoreConfig::new(usize::MAX, document_type)?;
            let service = ConversionService::new(&cfg);
            let request = match upload(SourceFormat::Ccda, &file) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };
            match service.convert_cda(request) {
                ConversionResult::Success(bundle) => println!("{}", to_json_indented(&bundle, 2)?),
                ConversionResult::Failure(failure) => {
                    eprintln!("{}", to_json_indented(&CdaErrorBody::from(&failure), 2)?);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Some(Commands::Labcheck { file }) => {
            let service = ConversionService::new(&CoreConfig::default());
            let request = match upload(SourceFormat::Hl7, &file) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };
            match service.check_hl7(request) {
                ConversionResult::Success(parsed) => println!("{}", to_json_indented(&parsed, 2)?),
                ConversionResult::Failure(failure) if failure.class == FailureClass::Invalid => {
                    eprintln!("{}", to_json_indented(&InvalidHl7Body::from(&failure), 2)?);
                    return Ok(ExitCode::FAILURE);
                }
                ConversionResult::Failure(failure) => {
                    eprintln!("Error: {}", failure.error);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Some(Commands::Validate { file }) => {
            let text = std::fs::read_to_string(&file)?;
            match hl7::validate(&hl7::cleanup(&text)) {
                Ok(()) => println!("valid"),
                Err(e) => {
                    println!("invalid: {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        None => {
            println!("Use 'interop --help' for commands");
        }
    }

    Ok(ExitCode::SUCCESS)
}
