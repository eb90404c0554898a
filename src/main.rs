use mutind::env::Env;
use mutind::inductive::{IndArity, MutIndBody};
use mutind::log::init_logging;
use mutind::util::{Config, TcCtx};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), MainError> {
    let mut args = std::env::args();
    let _ = args.next();
    let out = match args.next().as_ref() {
        None => Err(Box::from("This program expects a path to a configuration file.".to_string())),
        Some(p) if p == "-h" || p == "--help" => return Ok(println!("{}", HELP_LONG)),
        Some(p) => use_config(Path::new(p)),
    }
    .map_err(MainError)?;

    if let Some(msg) = out {
        println!("{}", msg);
    }
    Ok(())
}

fn packet_summary(ctx: &TcCtx, body: &MutIndBody) -> String {
    let mut out = format!("{:?}: nparams_rec = {}", ctx.debug_print(body.name), body.nparams_rec);
    for packet in body.packets.iter() {
        let arity = match &packet.arity {
            IndArity::Regular { squash, .. } => format!("{:?}", squash),
            IndArity::Template { .. } => String::from("template"),
        };
        out.push_str(&format!(
            "\n  {:?} : {:?}, {}, elim {:?}",
            ctx.debug_print(packet.typename),
            ctx.debug_print(packet.arity.sort()),
            arity,
            packet.kelim
        ));
    }
    out
}

// Returns an optional success message.
fn use_config(config_path: &Path) -> Result<Option<String>, Box<dyn Error>> {
    let cfg = Config::try_from(config_path)?;
    init_logging(&cfg.log_level)?;
    let decl_file = cfg.read_decl_file()?;
    let mut ctx = TcCtx::new();
    let mut env = Env::new(cfg.typing_flags());
    let summary = decl_file.run(&mut ctx, &mut env)?;
    if cfg.print_packets {
        for body in summary.blocks.iter() {
            println!("{}", packet_summary(&ctx, body));
        }
    }
    if cfg.print_success_message {
        Ok(Some(format!(
            "Checked {} declarations with no errors ({} inductive blocks, {} rejected as expected)",
            summary.num_commands,
            summary.blocks.len(),
            summary.expected_failures
        )))
    } else {
        Ok(None)
    }
}

struct MainError(Box<dyn Error>);

impl std::fmt::Debug for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}\n\n{}", self.0, HELP_SHORT) }
}

const HELP_SHORT: &str = "run with `-h` or `--help` for help";
const HELP_LONG: &str = concat!(
    "mutind_bin",
    " ",
    env!("CARGO_PKG_VERSION"),
    "\n\n",
    env!("CARGO_PKG_DESCRIPTION"),
    "\n\n",
    include_str!("../README.md")
);
