use clap::Parser;
use pve_migrate::{
    cli::{self, Args},
    config::FileConfig,
    interrupt,
    mount::MountManager,
    pve::Proxmox,
    vmid, MigrateError,
};

/// Report a validation or precondition failure and exit before touching anything.
fn exit_with(err: MigrateError) -> ! {
    eprintln!("ERROR: {}", err);
    std::process::exit(err.exit_code());
}

fn require_root() -> pve_migrate::Result<()> {
    if nix::unistd::geteuid().is_root() {
        Ok(())
    } else {
        Err(MigrateError::NotRoot)
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = require_root() {
        exit_with(e);
    }

    let file_config = FileConfig::load(args.config.as_deref()).unwrap_or_else(|e| exit_with(e));
    let mut settings = args
        .into_settings(file_config)
        .unwrap_or_else(|e| exit_with(e));

    let pve = Proxmox::new(settings.tools.clone());

    let vmids = vmid::parse_vmid_selector(&settings.vmids, || pve.list_vmids())
        .unwrap_or_else(|e| exit_with(e));

    if settings.password.is_none() {
        match cli::prompt::read_password("SMB password: ") {
            Ok(password) => settings.password = Some(password),
            Err(e) => exit_with(e.into()),
        }
    }

    println!(
        "VMIDs: {}",
        vmids
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // From here on a signal unwinds through the mount guard instead of killing us
    if let Err(e) = interrupt::install() {
        exit_with(e);
    }

    let mounts = MountManager::new(settings.mountpoint.clone(), &settings.vers, &settings.tools);

    if let Err(e) = cli::run(&settings, &vmids, &pve, &mounts) {
        eprintln!("ERROR: {:#}", e);
        let code = e
            .downcast_ref::<MigrateError>()
            .map_or(1, MigrateError::exit_code);
        std::process::exit(code);
    }
}
