use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mirrorpass",
    version,
    about = "Deferred shading with screen-space reflections"
)]
pub struct CliArgs {
    /// Scene description (TOML). Without it the built-in scene is rendered.
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Override the window width from the scene description
    #[arg(long)]
    pub width: Option<u32>,

    /// Override the window height from the scene description
    #[arg(long)]
    pub height: Option<u32>,

    /// Print the built-in scene as TOML and exit
    #[arg(long)]
    pub print_default_scene: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let args = CliArgs::parse_from([
            "mirrorpass",
            "--scene",
            "scenes/showcase.toml",
            "--width",
            "800",
            "--height",
            "600",
        ]);
        assert_eq!(args.scene, Some(PathBuf::from("scenes/showcase.toml")));
        assert_eq!(args.width, Some(800));
        assert_eq!(args.height, Some(600));
        assert!(!args.print_default_scene);
    }

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["mirrorpass"]);
        assert!(args.scene.is_none());
        assert!(args.width.is_none());
    }
}
