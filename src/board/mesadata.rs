use bimap::BiHashMap;

/// Layer and net names. Everything below the board works with indices only.
pub trait AccessMesadata {
    fn layer_count(&self) -> usize;

    fn bename_layer(&mut self, layer: usize, layername: String);
    fn layer_layername(&self, layer: usize) -> Option<&str>;
    fn layername_layer(&self, layername: &str) -> Option<usize>;

    fn bename_net(&mut self, net: usize, netname: String);
    fn net_netname(&self, net: usize) -> Option<&str>;
    fn netname_net(&self, netname: &str) -> Option<usize>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesadata {
    layer_count: usize,
    // layer <-> layername
    layer_layername: BiHashMap<usize, String>,
    // net <-> netname
    net_netname: BiHashMap<usize, String>,
}

impl Mesadata {
    /// Layers and nets are numbered in the order their names are given.
    pub fn new(layernames: &[String], netnames: &[String]) -> Self {
        Self {
            layer_count: layernames.len(),
            layer_layername: BiHashMap::from_iter(layernames.iter().cloned().enumerate()),
            net_netname: BiHashMap::from_iter(netnames.iter().cloned().enumerate()),
        }
    }

    pub fn net_count(&self) -> usize {
        self.net_netname.len()
    }

    pub fn layernames(&self) -> Vec<String> {
        (0..self.layer_count)
            .map(|layer| {
                self.layer_layername(layer)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("layer{}", layer))
            })
            .collect()
    }

    pub fn netnames(&self) -> Vec<String> {
        let mut nets: Vec<(&usize, &String)> = self.net_netname.iter().collect();
        nets.sort();
        nets.into_iter().map(|(_, name)| name.clone()).collect()
    }
}

impl AccessMesadata for Mesadata {
    fn layer_count(&self) -> usize {
        self.layer_count
    }

    fn bename_layer(&mut self, layer: usize, layername: String) {
        self.layer_count = self.layer_count.max(layer + 1);
        self.layer_layername.insert(layer, layername);
    }

    fn layer_layername(&self, layer: usize) -> Option<&str> {
        self.layer_layername.get_by_left(&layer).map(|s| s.as_str())
    }

    fn layername_layer(&self, layername: &str) -> Option<usize> {
        self.layer_layername.get_by_right(layername).copied()
    }

    fn bename_net(&mut self, net: usize, netname: String) {
        self.net_netname.insert(net, netname);
    }

    fn net_netname(&self, net: usize) -> Option<&str> {
        self.net_netname.get_by_left(&net).map(|s| s.as_str())
    }

    fn netname_net(&self, netname: &str) -> Option<usize> {
        self.net_netname.get_by_right(netname).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_resolve_both_ways() {
        let mut mesadata = Mesadata::new(
            &["F.Cu".to_string(), "B.Cu".to_string()],
            &["GND".to_string(), "VCC".to_string()],
        );

        assert_eq!(mesadata.layer_count(), 2);
        assert_eq!(mesadata.layername_layer("B.Cu"), Some(1));
        assert_eq!(mesadata.net_netname(0), Some("GND"));
        assert_eq!(mesadata.netname_net("SIG"), None);

        mesadata.bename_net(2, "SIG".to_string());
        assert_eq!(mesadata.netname_net("SIG"), Some(2));
        assert_eq!(mesadata.netnames(), vec!["GND", "VCC", "SIG"]);
    }
}
