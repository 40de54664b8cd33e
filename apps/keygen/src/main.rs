use std::path::PathBuf;

use clap::Parser;
use keygen::{run, Output, DEFAULT_BITS};

#[derive(Parser)]
#[command(name = "keygen")]
#[command(about = "Generate the RSA key pair shared by the auth and resource services")]
struct Args {
    /// Private key destination (auth service)
    #[arg(long, default_value = "apps/auth-service/rsa_keys/private.pem")]
    private_out: PathBuf,

    /// Public key destination (resource service)
    #[arg(long, default_value = "apps/resource-service/rsa_keys/public.pem")]
    public_out: PathBuf,

    /// Modulus size in bits
    #[arg(long, default_value_t = DEFAULT_BITS)]
    bits: usize,

    /// Replace existing key files
    #[arg(long)]
    force: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_env_filter("keygen=info")
        .init();

    let args = Args::parse();
    let output = Output {
        private_path: args.private_out,
        public_path: args.public_out,
        overwrite: args.force,
    };

    if run(args.bits, &output).is_err() {
        std::process::exit(1);
    }
}
