use clap::Parser;

#[derive(Parser)]
#[command(name = "related-files-lsp")]
#[command(
    version,
    about = "Language Server that checks files related to the symbol under the cursor via tsserver"
)]
struct Cli {}

fn main() -> anyhow::Result<()> {
    Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(related_files_lsp::lsp::server::run_server())
}
