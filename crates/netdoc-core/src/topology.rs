//! Layered topology view
//!
//! Groups flat equipment records into the layers a network diagram draws
//! top to bottom: gateways, switches, endpoints, then everything else.

use serde::Serialize;

use crate::model::{DeviceStatus, DeviceType, Equipment};

/// Diagram layer of a device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Gateway,
    Switch,
    Endpoint,
    Other,
}

impl From<DeviceType> for Layer {
    fn from(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Router | DeviceType::Firewall | DeviceType::Modem => Layer::Gateway,
            DeviceType::Switch => Layer::Switch,
            DeviceType::AccessPoint | DeviceType::Server => Layer::Endpoint,
            DeviceType::Other => Layer::Other,
        }
    }
}

/// Equipment grouped by layer, each layer in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopologyView {
    pub gateways: Vec<Equipment>,
    pub switches: Vec<Equipment>,
    pub endpoints: Vec<Equipment>,
    pub other: Vec<Equipment>,
}

impl TopologyView {
    pub fn derive(equipment: &[Equipment]) -> Self {
        let mut view = Self::default();
        for e in equipment {
            let layer = match Layer::from(e.device_type) {
                Layer::Gateway => &mut view.gateways,
                Layer::Switch => &mut view.switches,
                Layer::Endpoint => &mut view.endpoints,
                Layer::Other => &mut view.other,
            };
            layer.push(e.clone());
        }
        view
    }

    /// Every device, top layer first
    pub fn iter(&self) -> impl Iterator<Item = &Equipment> {
        self.gateways
            .iter()
            .chain(&self.switches)
            .chain(&self.endpoints)
            .chain(&self.other)
    }

    pub fn len(&self) -> usize {
        self.gateways.len() + self.switches.len() + self.endpoints.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Devices reported offline
    pub fn offline(&self) -> Vec<&Equipment> {
        self.iter().filter(|e| e.status == DeviceStatus::Offline).collect()
    }

    /// Devices that came from a provider rather than manual entry
    pub fn synced_count(&self) -> usize {
        self.iter().filter(|e| !e.source.is_manual()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProviderId, Source};

    #[test]
    fn test_layers_keep_input_order() {
        let equipment = vec![
            Equipment::new("1", "Office AP", DeviceType::AccessPoint),
            Equipment::new("2", "Edge FW", DeviceType::Firewall),
            Equipment::new("3", "Core Router", DeviceType::Router),
            Equipment::new("4", "Access Switch", DeviceType::Switch),
            Equipment::new("5", "NAS", DeviceType::Server),
            Equipment::new("6", "Printer", DeviceType::Other),
        ];

        let view = TopologyView::derive(&equipment);
        let ids = |layer: &[Equipment]| layer.iter().map(|e| e.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(&view.gateways), vec!["2", "3"]);
        assert_eq!(ids(&view.switches), vec!["4"]);
        assert_eq!(ids(&view.endpoints), vec!["1", "5"]);
        assert_eq!(ids(&view.other), vec!["6"]);
        assert_eq!(view.len(), 6);
    }

    #[test]
    fn test_offline_and_synced() {
        let x = ProviderId::new("unifi").unwrap();
        let equipment = vec![
            Equipment::new("1", "Manual Modem", DeviceType::Modem),
            Equipment::new("2", "Synced AP", DeviceType::AccessPoint)
                .with_source(Source::provider(&x))
                .with_status(DeviceStatus::Offline),
        ];

        let view = TopologyView::derive(&equipment);
        assert_eq!(view.synced_count(), 1);
        let offline = view.offline();
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].id, "2");
    }

    #[test]
    fn test_empty() {
        assert!(TopologyView::derive(&[]).is_empty());
    }
}
