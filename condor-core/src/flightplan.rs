//! Render a completed session into the flight-plan text format.
//!
//! The output is the INI-style `.fpl` layout used by the simulator:
//! `[Task]` with indexed turnpoint keys, then `[Plane]`, `[Weather]`,
//! `[GameOptions]`, and `[Description]` sections from the settings bundle.

use std::path::Path;

use serde::Serialize;

use crate::settings::{SettingsBundle, CLASS_UNKNOWN};
use crate::task::{TaskCore, Turnpoint};
use crate::types::Result;

/// Write-once artifact assembled from a complete session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightPlanDocument {
    pub landscape: String,
    pub turnpoints: Vec<Turnpoint>,
    pub disabled_airspaces: Vec<u16>,
    pub settings: SettingsBundle,
}

impl FlightPlanDocument {
    pub fn from_parts(task: &TaskCore, settings: &SettingsBundle, disabled: Vec<u16>) -> Self {
        FlightPlanDocument {
            landscape: task.landscape.clone(),
            turnpoints: task.turnpoints.clone(),
            disabled_airspaces: disabled,
            settings: settings.clone(),
        }
    }

    /// Render the `.fpl` text.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        lines.push("[Task]".to_string());
        lines.push(format!("Landscape={}", self.landscape));
        lines.push(format!("Count={}", self.turnpoints.len()));
        for (idx, tp) in self.turnpoints.iter().enumerate() {
            lines.push(format!("TPName{idx}={}", tp.name));
            lines.push(format!("TPPosX{idx}={:.6}", tp.x));
            lines.push(format!("TPPosY{idx}={:.6}", tp.y));
            lines.push(format!("TPRadius{idx}={}", tp.radius));
            lines.push(format!("TPAngle{idx}={}", tp.angle));
            lines.push(format!("TPAltitude{idx}={:.2}", tp.altitude));
        }
        if !self.disabled_airspaces.is_empty() {
            let ids: Vec<String> = self
                .disabled_airspaces
                .iter()
                .map(|v| v.to_string())
                .collect();
            lines.push(format!("DisabledAirspaces={}", ids.join(",")));
        }

        lines.push(String::new());
        lines.push("[Plane]".to_string());
        if self.settings.plane_class != CLASS_UNKNOWN && !self.settings.plane_class.is_empty() {
            lines.push(format!("Class={}", self.settings.plane_class));
        }

        lines.push(String::new());
        lines.push("[Weather]".to_string());
        if !self.settings.weather_zone.is_empty() {
            lines.push("WZCount=1".to_string());
            lines.push(String::new());
            lines.push("[WeatherZone0]".to_string());
            lines.push(format!("Name={}", self.settings.weather_zone));
        }

        lines.push(String::new());
        lines.push("[GameOptions]".to_string());
        for (key, value) in &self.settings.options {
            lines.push(format!("{key}={value}"));
        }

        lines.push(String::new());
        lines.push("[Description]".to_string());
        if !self.settings.description.is_empty() {
            let text = self.settings.description.replace(['\r', '\n'], " ");
            lines.push(format!("Text={text}"));
        }

        lines.join("\n") + "\n"
    }

    /// Persist the rendered document.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_doc() -> FlightPlanDocument {
        let task = TaskCore {
            landscape: "AA3".into(),
            turnpoints: vec![
                Turnpoint {
                    name: "Start".into(),
                    x: 800934.75,
                    y: 95883.93,
                    radius: 3000,
                    angle: 180,
                    altitude: 1200.0,
                },
                Turnpoint {
                    name: "Finish".into(),
                    x: 812000.5,
                    y: 99100.0,
                    radius: 1000,
                    angle: 360,
                    altitude: 600.0,
                },
            ],
        };
        let settings = SettingsBundle {
            description: "Evening ridge\nrun".into(),
            plane_class: "18-meter".into(),
            weather_zone: "Base".into(),
            options: BTreeMap::from([("StartHeight".into(), "1500".into())]),
        };
        FlightPlanDocument::from_parts(&task, &settings, vec![3, 7, 12])
    }

    #[test]
    fn test_render_task_section() {
        let text = sample_doc().render();
        assert!(text.starts_with("[Task]\nLandscape=AA3\nCount=2\n"));
        assert!(text.contains("TPName0=Start\n"));
        assert!(text.contains("TPPosX0=800934.750000\n"));
        assert!(text.contains("TPRadius1=1000\n"));
        assert!(text.contains("TPAltitude1=600.00\n"));
        assert!(text.contains("DisabledAirspaces=3,7,12\n"));
    }

    #[test]
    fn test_render_settings_sections() {
        let text = sample_doc().render();
        assert!(text.contains("[Plane]\nClass=18-meter\n"));
        assert!(text.contains("[Weather]\nWZCount=1\n\n[WeatherZone0]\nName=Base\n"));
        assert!(text.contains("[GameOptions]\nStartHeight=1500\n"));
        // Newlines in the description collapse to one line.
        assert!(text.contains("[Description]\nText=Evening ridge run\n"));
    }

    #[test]
    fn test_render_unknown_class_omitted() {
        let mut doc = sample_doc();
        doc.settings.plane_class = CLASS_UNKNOWN.into();
        let text = doc.render();
        assert!(!text.contains("Class="));
        assert!(text.contains("[Plane]"));
    }

    #[test]
    fn test_render_no_disabled_line_when_empty() {
        let mut doc = sample_doc();
        doc.disabled_airspaces.clear();
        assert!(!doc.render().contains("DisabledAirspaces="));
    }
}
