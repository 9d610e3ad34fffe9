use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use bleper::config::{BitmapArgs, DumpOptions, PeripheralConfig, ServiceIds};

#[derive(Parser, Debug)]
#[command(name = "bleper", about = "BLE bitmap peripheral simulator and e-book frame server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulated BLE peripheral: dumps (and optionally renders) writes read from stdin
    Peripheral(PeripheralArgs),
    /// Web page that simulates an e-book screen and accepts /image uploads
    #[cfg(feature = "web")]
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct PeripheralArgs {
    /// Advertised local name
    #[arg(long, default_value = "BlePer")]
    name: String,

    /// Service UUID
    #[arg(long, default_value = "FFF0")]
    service_uuid: String,

    /// Writable characteristic UUID for commands
    #[arg(long, default_value = "FFF1")]
    cmd_uuid: String,

    /// Writable characteristic UUID for data
    #[arg(long, default_value = "FFF2")]
    data_uuid: String,

    /// Also print base64 of incoming bytes
    #[arg(long)]
    show_base64: bool,

    /// Do not attempt to decode utf-8
    #[arg(long)]
    no_utf8: bool,

    /// Render incoming bytes as a 1bpp bitmap, e.g. "128x64"
    #[arg(long, value_name = "WxH")]
    bitmap: Option<String>,

    /// Treat incoming bytes as "BMP1" header + payload
    #[arg(long)]
    bitmap_header: bool,

    /// Bytes per row for --bitmap (default: ceil(width/8))
    #[arg(long)]
    bitmap_row_bytes: Option<u32>,

    /// Bitmap bit order: LSB first
    #[arg(long)]
    bitmap_lsb_first: bool,

    /// Invert bitmap bits
    #[arg(long)]
    bitmap_invert: bool,

    /// Character for set pixels
    #[arg(long, default_value = "#")]
    bitmap_on: String,

    /// Character for clear pixels
    #[arg(long, default_value = ".")]
    bitmap_off: String,

    /// Read link events from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

#[cfg(feature = "web")]
#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 18080)]
    port: u16,

    #[arg(long, default_value_t = 480)]
    screen_width: i64,

    #[arg(long, default_value_t = 800)]
    screen_height: i64,

    /// Binarize threshold (0-255); brighter pixels become white
    #[arg(long, default_value_t = 128)]
    threshold: i64,

    /// Invert luminance before thresholding
    #[arg(long)]
    invert: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,axum::rejection=trace"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();

    let res = match cli.command {
        Command::Peripheral(args) => run_peripheral(args),
        #[cfg(feature = "web")]
        Command::Serve(args) => run_serve(args),
    };

    if let Err(err) = res {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run_peripheral(args: PeripheralArgs) -> bleper::Result<()> {
    let ids = ServiceIds {
        name: args.name,
        service: args.service_uuid,
        command: args.cmd_uuid,
        data: args.data_uuid,
    };
    let dump = DumpOptions {
        show_base64: args.show_base64,
        try_utf8: !args.no_utf8,
    };
    let bitmap = BitmapArgs {
        size: args.bitmap,
        header: args.bitmap_header,
        row_bytes: args.bitmap_row_bytes,
        lsb_first: args.bitmap_lsb_first,
        invert: args.bitmap_invert,
    };
    let config = PeripheralConfig::new(ids, dump, &bitmap, &args.bitmap_on, &args.bitmap_off)?;
    bleper::run_peripheral(config, args.input.as_deref())
}

#[cfg(feature = "web")]
fn run_serve(args: ServeArgs) -> bleper::Result<()> {
    let config = bleper::ServerConfig::new(
        &args.host,
        args.port,
        args.screen_width,
        args.screen_height,
        args.threshold,
        args.invert,
    )?;
    bleper::web::run_server(config)
}
