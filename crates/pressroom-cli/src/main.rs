// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod profile;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::{Config, ResourceKind};
use pressroom_app::{Comment, Ticket};
use runtime::Runtime;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pressroom --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_file = config.log_file()?;
    logging::init_logging(config.log_level(), &log_file)?;

    let runtime = Runtime::from_config(&config)
        .with_context(|| format!("invalid [api] config in {}", options.config_path.display()))?;
    let resource = match options.resource {
        Some(resource) => resource,
        None => config.resource()?,
    };

    match options.command {
        Command::Check => {
            println!(
                "config ok: {} ({} as {})",
                runtime.client().base_url(),
                resource.as_str(),
                config.session().access_label()
            );
            Ok(())
        }
        Command::Stats { article_id } => {
            println!("{}", runtime.article_stats(&article_id)?);
            Ok(())
        }
        Command::UploadImage {
            article_id,
            slot,
            file,
        } => {
            let result = runtime.upload_article_image(&article_id, &slot, &file);
            print_messages(&runtime);
            if let Some(url) = result? {
                println!("{url}");
            }
            Ok(())
        }
        Command::RemoveImage { article_id, slot } => {
            let result = runtime.remove_article_image(&article_id, &slot);
            print_messages(&runtime);
            result
        }
        Command::SaveProfile { file } => {
            let result = runtime.save_profile(&file);
            print_messages(&runtime);
            result
        }
        Command::ResendEmail => {
            let result = runtime.resend_email_confirmation();
            print_messages(&runtime);
            result
        }
        Command::CancelEmailChange => {
            let result = runtime.cancel_email_change();
            print_messages(&runtime);
            result
        }
        Command::Interactive => match resource {
            ResourceKind::Tickets => runtime.run_view::<Ticket>(),
            ResourceKind::Comments => runtime.run_view::<Comment>(),
        },
    }
}

fn print_messages(runtime: &Runtime) {
    for message in runtime.drain_messages() {
        eprintln!("{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Interactive,
    Check,
    Stats {
        article_id: String,
    },
    UploadImage {
        article_id: String,
        slot: String,
        file: PathBuf,
    },
    RemoveImage {
        article_id: String,
        slot: String,
    },
    SaveProfile {
        file: PathBuf,
    },
    ResendEmail,
    CancelEmailChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    resource: Option<ResourceKind>,
    print_config_path: bool,
    print_example: bool,
    show_help: bool,
    command: Command,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        resource: None,
        print_config_path: false,
        print_example: false,
        show_help: false,
        command: Command::Interactive,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                options.config_path =
                    PathBuf::from(next_value(&mut iter, "--config", "a file path")?);
            }
            "--resource" => {
                let raw = next_value(&mut iter, "--resource", "tickets or comments")?;
                options.resource = Some(ResourceKind::parse(&raw)?);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                set_command(&mut options, Command::Check)?;
            }
            "--stats" => {
                let article_id = next_value(&mut iter, "--stats", "an article id")?;
                set_command(&mut options, Command::Stats { article_id })?;
            }
            "--upload-image" => {
                const OPERANDS: &str = "<article-id> <slot> <file>";
                let article_id = next_value(&mut iter, "--upload-image", OPERANDS)?;
                let slot = next_value(&mut iter, "--upload-image", OPERANDS)?;
                let file = PathBuf::from(next_value(&mut iter, "--upload-image", OPERANDS)?);
                set_command(
                    &mut options,
                    Command::UploadImage {
                        article_id,
                        slot,
                        file,
                    },
                )?;
            }
            "--remove-image" => {
                let article_id = next_value(&mut iter, "--remove-image", "<article-id> <slot>")?;
                let slot = next_value(&mut iter, "--remove-image", "<article-id> <slot>")?;
                set_command(&mut options, Command::RemoveImage { article_id, slot })?;
            }
            "--save-profile" => {
                let file = PathBuf::from(next_value(&mut iter, "--save-profile", "a profile file")?);
                set_command(&mut options, Command::SaveProfile { file })?;
            }
            "--resend-email" => {
                set_command(&mut options, Command::ResendEmail)?;
            }
            "--cancel-email-change" => {
                set_command(&mut options, Command::CancelEmailChange)?;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn next_value<I, S>(iter: &mut I, flag: &str, what: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    iter.next()
        .map(|value| value.as_ref().to_owned())
        .ok_or_else(|| anyhow!("{flag} requires {what}"))
}

fn set_command(options: &mut CliOptions, command: Command) -> Result<()> {
    if options.command != Command::Interactive {
        return Err(anyhow!(
            "only one command flag may be given (--check, --stats, --upload-image, --remove-image, --save-profile, --resend-email, --cancel-email-change)"
        ));
    }
    options.command = command;
    Ok(())
}

fn print_help() {
    println!("pressroom");
    println!("  --config <path>                        Use a specific config path");
    println!("  --resource <tickets|comments>          Pick the list to open");
    println!("  --print-config-path                    Print resolved config path");
    println!("  --print-example-config                 Print a v1 config template");
    println!("  --check                                Validate config and exit");
    println!("  --stats <article-id>                   Print views, likes and comments of an article");
    println!("  --upload-image <article-id> <slot> <file>  Upload smallImg|mediumImg|bigImg");
    println!("  --remove-image <article-id> <slot>     Delete an article image");
    println!("  --save-profile <file>                  Save profile edits from a TOML file");
    println!("  --resend-email                         Resend the pending e-mail confirmation");
    println!("  --cancel-email-change                  Drop the pending e-mail change");
    println!("  --help                                 Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Command, parse_cli_args};
    use crate::config::ResourceKind;
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/pressroom-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                resource: None,
                print_config_path: false,
                print_example: false,
                show_help: false,
                command: Command::Interactive,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_and_resource() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml", "--resource", "comments"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(options.resource, Some(ResourceKind::Comments));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_rejects_unknown_resource() {
        let error = parse_cli_args(vec!["--resource", "users"], default_options_path())
            .expect_err("users has no list view");
        assert!(error.to_string().contains("unknown resource"));
    }

    #[test]
    fn parse_cli_args_reads_upload_operands() -> Result<()> {
        let options = parse_cli_args(
            vec!["--upload-image", "a1", "bigImg", "/tmp/cover.png"],
            default_options_path(),
        )?;
        assert_eq!(
            options.command,
            Command::UploadImage {
                article_id: "a1".to_owned(),
                slot: "bigImg".to_owned(),
                file: PathBuf::from("/tmp/cover.png"),
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_requires_all_remove_operands() {
        let error = parse_cli_args(vec!["--remove-image", "a1"], default_options_path())
            .expect_err("slot is missing");
        assert!(error.to_string().contains("--remove-image requires"));
    }

    #[test]
    fn parse_cli_args_allows_one_command() {
        let error = parse_cli_args(vec!["--check", "--stats", "a1"], default_options_path())
            .expect_err("two commands should fail");
        assert!(error.to_string().contains("only one command flag"));
    }

    #[test]
    fn parse_cli_args_reads_profile_commands() -> Result<()> {
        let options = parse_cli_args(
            vec!["--save-profile", "/tmp/profile.toml"],
            default_options_path(),
        )?;
        assert_eq!(
            options.command,
            Command::SaveProfile {
                file: PathBuf::from("/tmp/profile.toml"),
            }
        );
        let options = parse_cli_args(vec!["--cancel-email-change"], default_options_path())?;
        assert_eq!(options.command, Command::CancelEmailChange);
        let error = parse_cli_args(
            vec!["--resend-email", "--cancel-email-change"],
            default_options_path(),
        )
        .expect_err("two commands should fail");
        assert!(error.to_string().contains("only one command flag"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_print_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--help"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.show_help);
        assert_eq!(options.command, Command::Interactive);
        Ok(())
    }
}
