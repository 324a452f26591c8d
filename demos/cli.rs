use css_module_deps::CssMode;
use css_module_deps::CssModule;
use css_module_deps::CssParser;
use css_module_deps::CssParserOptions;
use css_module_deps::LocConverter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("USAGE: cli <path> [auto|pure|global|local]");
        return;
    };
    let default_mode = match args.next().as_deref() {
        None | Some("auto") => CssMode::Auto,
        Some("pure") => CssMode::Pure,
        Some("global") => CssMode::Global,
        Some("local") => CssMode::Local,
        Some(other) => {
            eprintln!("Unknown mode: {}", other);
            return;
        }
    };
    let Ok(input) = std::fs::read_to_string(&path) else {
        eprintln!("Failed to read file: {}", path);
        return;
    };
    let parser = match CssParser::new(CssParserOptions {
        default_mode,
        ..Default::default()
    }) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    let mut module = CssModule::new(path.as_str());
    if let Err(e) = parser.parse(&input, &mut module) {
        eprintln!("{}", e);
        return;
    }

    if module.dependencies().is_empty() {
        println!("No dependencies found");
    } else {
        println!("Dependencies:");
        for dependency in module.dependencies() {
            println!("{:?}", dependency);
        }
    }
    if !module.presentational_dependencies().is_empty() {
        println!("Removed:");
        for dependency in module.presentational_dependencies() {
            println!("{:?}", dependency.range);
        }
    }
    if module.warnings().is_empty() {
        println!("No warnings found");
    } else {
        println!("Warnings:");
        let source = input.strip_prefix('\u{feff}').unwrap_or(&input);
        let mut loc = LocConverter::new(source);
        for warning in module.warnings() {
            let start = loc.get(warning.range().start);
            println!("{}:{}:{}: {}", path, start.line, start.column, warning);
        }
    }
}
