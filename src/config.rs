use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, VisualizeError};

/// Layout and style settings, read from one section of an ini file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Config {
    pub aspect_ratio: f64,
    pub dpi: i64,
    pub font_scale: f64,
    pub color_scatter: f64,
    pub edge_color: String,
    pub font_color: String,
    pub color_map: String,
    pub img_y_height_inches: f64,
    pub y_sublevels: i64,
    pub y_sublevel_spacing: f64,
    pub num_iterations: i64,
    pub edge_alpha: f64,
    pub max_displacement: f64,
    pub top_level_spacing: f64,
    pub repulsive_force_normalization: f64,
    pub attractive_force_normalization: f64,
    pub add_size_per_out_link: i64,
    pub max_node_size_over_min_node_size: f64,
    pub min_node_size: f64,
    pub tmax: f64,
    pub show_labels: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aspect_ratio: 2.0,
            dpi: 300,
            font_scale: 1.0,
            color_scatter: 1.0,
            edge_color: "#888888".to_string(),
            font_color: "#888888".to_string(),
            color_map: "rainbow".to_string(),
            img_y_height_inches: 24.0,
            y_sublevels: 5,
            y_sublevel_spacing: 0.2,
            num_iterations: 100,
            edge_alpha: 0.3,
            max_displacement: 2.5,
            top_level_spacing: 100.0,
            repulsive_force_normalization: 2.0,
            attractive_force_normalization: 1.0,
            add_size_per_out_link: 200,
            max_node_size_over_min_node_size: 5.0,
            min_node_size: 100.0,
            tmax: 30.0,
            show_labels: 1,
        }
    }
}

impl Config {
    /// Resolves the configuration for a run.
    ///
    /// Without a file every option takes its default. A file with several
    /// sections needs `section`; a file with one section uses it regardless.
    pub fn load(path: Option<&Path>, section: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            info!("--configfile not set, using all defaults");
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path).map_err(|err| VisualizeError::ConfigRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let ini = IniFile::parse(&text).map_err(|message| VisualizeError::ConfigRead {
            path: path.to_path_buf(),
            message,
        })?;

        let chosen = if ini.sections.len() > 1 {
            let Some(section) = section else {
                return Err(VisualizeError::ConfigAmbiguity {
                    path: path.to_path_buf(),
                });
            };
            if ini.section(section).is_none() {
                return Err(VisualizeError::ConfigSectionNotFound {
                    path: path.to_path_buf(),
                    section: section.to_string(),
                });
            }
            section.to_string()
        } else if let Some((name, _)) = ini.sections.first() {
            name.clone()
        } else {
            info!(path = %path.display(), "config file has no sections, using all defaults");
            return Ok(Self::default());
        };

        info!("Reading section [{}] of file {}", chosen, path.display());
        let values = ini.section(&chosen).unwrap_or_default();
        let config = Self::from_values(&values);
        match serde_json::to_string(&config) {
            Ok(json) => debug!("Resolved configuration: {json}"),
            Err(err) => debug!("Could not serialize configuration: {err}"),
        }
        Ok(config)
    }

    /// Builds a config from raw option strings. Absent or unparsable options
    /// fall back to their defaults.
    pub fn from_values(values: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let reader = OptionReader { values };

        Self {
            aspect_ratio: reader.get("aspect_ratio", defaults.aspect_ratio),
            dpi: reader.get("dpi", defaults.dpi),
            font_scale: reader.get("font_scale", defaults.font_scale),
            color_scatter: reader.get("color_scatter", defaults.color_scatter),
            edge_color: reader.get("edge_color", defaults.edge_color),
            font_color: reader.get("font_color", defaults.font_color),
            color_map: reader.get("color_map", defaults.color_map),
            img_y_height_inches: reader.get("img_y_height_inches", defaults.img_y_height_inches),
            y_sublevels: reader.get("y_sublevels", defaults.y_sublevels),
            y_sublevel_spacing: reader.get("y_sublevel_spacing", defaults.y_sublevel_spacing),
            num_iterations: reader.get("num_iterations", defaults.num_iterations),
            edge_alpha: reader.get("edge_alpha", defaults.edge_alpha),
            max_displacement: reader.get("max_displacement", defaults.max_displacement),
            top_level_spacing: reader.get("top_level_spacing", defaults.top_level_spacing),
            repulsive_force_normalization: reader.get(
                "repulsive_force_normalization",
                defaults.repulsive_force_normalization,
            ),
            attractive_force_normalization: reader.get(
                "attractive_force_normalization",
                defaults.attractive_force_normalization,
            ),
            add_size_per_out_link: reader
                .get("add_size_per_out_link", defaults.add_size_per_out_link),
            max_node_size_over_min_node_size: reader.get(
                "max_node_size_over_min_node_size",
                defaults.max_node_size_over_min_node_size,
            ),
            min_node_size: reader.get("min_node_size", defaults.min_node_size),
            tmax: reader.get("tmax", defaults.tmax),
            show_labels: reader.get("show_labels", defaults.show_labels),
        }
    }

    pub fn max_node_size(&self) -> f64 {
        self.max_node_size_over_min_node_size * self.min_node_size
    }
}

struct OptionReader<'a> {
    values: &'a HashMap<String, String>,
}

impl OptionReader<'_> {
    fn get<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + std::fmt::Debug,
    {
        let Some(raw) = self.values.get(key) else {
            info!("Adding default of {default:?} for {key}");
            return default;
        };

        match raw.trim().parse::<T>() {
            Ok(value) => {
                debug!("Setting {key} to {value:?}");
                value
            }
            Err(_) => {
                info!("Could not parse {raw:?} for {key}, adding default of {default:?}");
                default
            }
        }
    }
}

/// Minimal ini reader. `#` comments are whole-line only, so `#rrggbb` values
/// survive; `;` also ends a value when whitespace precedes it. Indented lines
/// continue the previous value and `[DEFAULT]` feeds every section.
#[derive(Debug, Default)]
struct IniFile {
    defaults: HashMap<String, String>,
    sections: Vec<(String, HashMap<String, String>)>,
}

impl IniFile {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut ini = Self::default();
        let mut current: Option<usize> = None;
        let mut in_defaults = false;
        let mut last_key: Option<String> = None;

        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if line.starts_with([' ', '\t']) {
                if let Some(key) = &last_key {
                    let target = match (in_defaults, current) {
                        (true, _) => Some(&mut ini.defaults),
                        (false, Some(index)) => Some(&mut ini.sections[index].1),
                        (false, None) => None,
                    };
                    if let Some(value) = target.and_then(|values| values.get_mut(key)) {
                        value.push('\n');
                        value.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                let name = name.trim().to_string();
                last_key = None;
                if name == "DEFAULT" {
                    in_defaults = true;
                    current = None;
                } else {
                    in_defaults = false;
                    current = Some(match ini.sections.iter().position(|(n, _)| *n == name) {
                        Some(index) => index,
                        None => {
                            ini.sections.push((name, HashMap::new()));
                            ini.sections.len() - 1
                        }
                    });
                }
                continue;
            }

            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(format!("line {}: expected `key = value`", number + 1));
            };
            let key = trimmed[..split].trim().to_lowercase();
            let value = strip_inline_comment(&trimmed[split + 1..]).to_string();

            let values = if in_defaults {
                &mut ini.defaults
            } else if let Some(index) = current {
                &mut ini.sections[index].1
            } else {
                return Err(format!("line {}: option outside of a section", number + 1));
            };
            values.insert(key.clone(), value);
            last_key = Some(key);
        }

        Ok(ini)
    }

    fn section(&self, name: &str) -> Option<HashMap<String, String>> {
        let (_, values) = self.sections.iter().find(|(n, _)| n == name)?;
        let mut merged = self.defaults.clone();
        merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(merged)
    }
}

fn strip_inline_comment(value: &str) -> &str {
    let cut = value
        .char_indices()
        .find(|&(index, c)| c == ';' && value[..index].ends_with(char::is_whitespace))
        .map_or(value.len(), |(index, _)| index);
    value[..cut].trim()
}
