use anyhow::{Context, Result};
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use doc_intake::{
    FeatureAssembler, FeatureTable, IdentityResolver, PayloadLoader, RawDocument, StdoutSink,
    DocumentType, ExtractionRecord, ValidationEngine,
};

const DEFAULT_REGION: &str = "APAC";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let input_dir = args.get(1).map(String::as_str).unwrap_or("./sample_data");
    let output_dir = args.get(2).map(String::as_str).unwrap_or("./feature_views");

    run_pipeline(Path::new(input_dir), Path::new(output_dir))
}

fn run_pipeline(input_dir: &Path, output_dir: &Path) -> Result<()> {
    println!("📥 Document Intake Pipeline v{}", doc_intake::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let sink = StdoutSink;
    let resolver = IdentityResolver::new(DEFAULT_REGION);
    let loader = PayloadLoader::new();
    let engine = ValidationEngine::new();
    let assembler = FeatureAssembler::new();

    // 1. Discover documents and resolve identities
    println!("\n📂 Scanning {}...", input_dir.display());
    let documents = collect_documents(input_dir, &resolver, &sink)?;
    println!("✓ Resolved {} documents", documents.len());

    // 2. Load payloads
    println!("\n📄 Loading payloads...");
    let records = loader.load_batch(&documents, &sink);
    println!("✓ Extracted {} records", records.len());

    // 3. Validate
    println!("\n✅ Validating records...");
    let results = engine.validate_batch(&records, &sink);
    let valid: Vec<ExtractionRecord> = records
        .into_iter()
        .zip(&results)
        .filter(|(_, result)| result.is_valid)
        .map(|(record, _)| record)
        .collect();
    println!(
        "✓ {} valid, {} rejected",
        valid.len(),
        results.len() - valid.len()
    );

    // 4. Assemble feature views from valid records only
    println!("\n🏗️  Assembling feature views...");
    let bank = table_for(&valid, DocumentType::BankStatement, "bank_statements");
    let loan = table_for(&valid, DocumentType::LoanApplication, "loan_applications");
    let onboard = table_for(&valid, DocumentType::OnboardingForm, "onboarding_forms");

    let churn = assembler.build_churn_view(&bank, &loan, &onboard)?;
    let loan_risk = assembler.build_loan_risk_view(&loan, &bank)?;
    println!(
        "✓ Churn view: {} customers | Loan risk view: {} applications",
        churn.len(),
        loan_risk.len()
    );

    // 5. Export
    println!("\n💾 Writing feature views...");
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let churn_path = write_view(&churn, output_dir)?;
    let loan_risk_path = write_view(&loan_risk, output_dir)?;
    println!("✓ {}", churn_path.display());
    println!("✓ {}", loan_risk_path.display());

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Pipeline complete");

    Ok(())
}

/// Walk the input directory and pair each conventionally-named file with its
/// resolved identity. Files that don't follow the convention are skipped with
/// a diagnostic and never enter the batch.
fn collect_documents(
    input_dir: &Path,
    resolver: &IdentityResolver,
    sink: &StdoutSink,
) -> Result<Vec<RawDocument>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(input_dir)
        .with_context(|| format!("Input directory does not exist: {}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    // Stable batch order regardless of filesystem iteration
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let Some(identity) = resolver.resolve_with_diagnostics(stem, sink) else {
            continue;
        };

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        documents.push(RawDocument {
            file_name,
            identity,
            content,
        });
    }

    Ok(documents)
}

fn table_for(
    records: &[ExtractionRecord],
    document_type: DocumentType,
    name: &str,
) -> FeatureTable {
    let matching: Vec<ExtractionRecord> = records
        .iter()
        .filter(|r| r.identity.document_type == document_type)
        .cloned()
        .collect();
    FeatureTable::from_records(name, &matching)
}

fn write_view(view: &FeatureTable, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.csv", view.name()));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    view.write_csv(file)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
