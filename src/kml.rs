//! Serializes a [`MapDocument`] to KML 2.2.

use crate::{
    map::{LinkPath, MapDocument, NodeStyle, Placemark},
    peers::Location,
};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Renders `map` as a complete KML file.
pub fn render(map: &MapDocument) -> String {
    let mut writer = Writer::default();
    writer.line(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    writer.open(&format!(r#"kml xmlns="{KML_NAMESPACE}""#));
    writer.open("Document");
    writer.text_element("name", &map.name);
    writer.text_element("open", "1");

    for style in &map.styles {
        write_style(&mut writer, style, map);
    }
    for placemark in &map.placemarks {
        write_placemark(&mut writer, placemark, map.details_altitude);
    }
    for path in &map.links {
        write_link(&mut writer, path);
    }

    writer.close("Document");
    writer.close("kml");
    writer.finish()
}

fn write_style(writer: &mut Writer, style: &NodeStyle, map: &MapDocument) {
    let color = style.color.to_kml();
    writer.open(&format!(r#"Style id="{}""#, escape(&style.id)));
    writer.open("IconStyle");
    writer.open("Icon");
    writer.text_element("href", &map.icon_href);
    writer.close("Icon");
    writer.close("IconStyle");
    writer.open("LabelStyle");
    writer.text_element("color", &color);
    writer.close("LabelStyle");
    writer.open("LineStyle");
    writer.text_element("color", &color);
    writer.text_element("width", &map.line_width.to_string());
    writer.close("LineStyle");
    writer.close("Style");
}

/// A ground-level pin named after the node, plus a raised bubble carrying
/// its version and peer count.
fn write_placemark(writer: &mut Writer, placemark: &Placemark, details_altitude: f64) {
    let address = placemark.address.to_string();
    let style_url = format!("#{}", placemark.style_id);

    writer.open("Placemark");
    writer.text_element("name", &address);
    writer.text_element("styleUrl", &style_url);
    write_point(writer, placemark.location, 0.0);
    writer.close("Placemark");

    writer.open("Placemark");
    writer.text_element("name", &format!("Node: {address}"));
    writer.text_element(
        "description",
        &format!(
            "Version: {}<br/>Peers List: {}",
            placemark.version, placemark.peer_count
        ),
    );
    writer.text_element("styleUrl", &style_url);
    write_point(writer, placemark.location, details_altitude);
    writer.close("Placemark");
}

fn write_point(writer: &mut Writer, location: Location, altitude: f64) {
    writer.open("Point");
    writer.text_element("coordinates", &coordinate(location, altitude));
    writer.close("Point");
}

fn write_link(writer: &mut Writer, path: &LinkPath) {
    writer.open("Placemark");
    writer.text_element("styleUrl", &format!("#{}", path.style_id));
    writer.open("LineString");
    writer.text_element(
        "coordinates",
        &format!(
            "{} {}",
            coordinate(path.from, 0.0),
            coordinate(path.to, 0.0)
        ),
    );
    writer.close("LineString");
    writer.close("Placemark");
}

/// KML coordinate tuples are longitude first.
fn coordinate(location: Location, altitude: f64) -> String {
    format!("{},{},{}", location.longitude, location.latitude, altitude)
}

/// Escapes the five XML special characters and drops characters XML 1.0
/// cannot carry at all, such as terminal escapes in a node's version string.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if is_xml_char(c) => escaped.push(c),
            _ => {}
        }
    }
    escaped
}

/// The `Char` production of XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t'
            | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Indenting element writer. Tags are trusted, text content is escaped.
#[derive(Default)]
struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, content: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(content);
        self.out.push('\n');
    }

    /// `tag` is the whole opening tag body, attributes included.
    fn open(&mut self, tag: &str) {
        self.line(&format!("<{tag}>"));
        self.depth += 1;
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{name}>"));
    }

    fn text_element(&mut self, name: &str, text: &str) {
        self.line(&format!("<{name}>{}</{name}>", escape(text)));
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MapConfig,
        peers::{Node, Probe, ScanReport},
    };

    fn node(address: &str, peers: &[&str], lat: f64, lon: f64) -> Node {
        Node {
            address: address.parse().unwrap(),
            ip: None,
            country_code: "DE".to_owned(),
            location: Some(Location {
                latitude: lat,
                longitude: lon,
            }),
            version: "3.8.4".to_owned(),
            peers: peers.iter().map(|p| p.parse().unwrap()).collect(),
        }
    }

    fn sample_map() -> MapDocument {
        let mut report = ScanReport::default();
        for node in [
            node("a.example.org", &["b.example.org"], 52.5, 13.4),
            node("b.example.org", &["a.example.org"], 48.85, 2.35),
        ] {
            report.insert(node.address.clone(), Probe::Reachable(node));
        }
        MapDocument::build(&report, &MapConfig::default())
    }

    fn kml_children<'a, 'input>(
        node: roxmltree::Node<'a, 'input>,
        name: &'a str,
    ) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
        node.children()
            .filter(move |child| child.has_tag_name((KML_NAMESPACE, name)))
    }

    #[test]
    fn renders_well_formed_kml() {
        let kml = render(&sample_map());
        let doc = roxmltree::Document::parse(&kml).unwrap();

        let root = doc.root_element();
        assert!(root.has_tag_name((KML_NAMESPACE, "kml")));
        let document = kml_children(root, "Document").next().unwrap();

        let name = kml_children(document, "name").next().unwrap();
        assert_eq!(name.text(), Some("P2P Network Map"));
        assert_eq!(kml_children(document, "Style").count(), 2);
        // two pins, two bubbles, one link
        assert_eq!(kml_children(document, "Placemark").count(), 5);

        let lines: Vec<_> = document
            .descendants()
            .filter(|n| n.has_tag_name((KML_NAMESPACE, "LineString")))
            .collect();
        assert_eq!(lines.len(), 1);
        let coordinates = kml_children(lines[0], "coordinates").next().unwrap();
        assert_eq!(coordinates.text(), Some("13.4,52.5,0 2.35,48.85,0"));
    }

    #[test]
    fn placemarks_reference_declared_styles() {
        let kml = render(&sample_map());
        let doc = roxmltree::Document::parse(&kml).unwrap();

        let declared: Vec<String> = doc
            .descendants()
            .filter(|n| n.has_tag_name((KML_NAMESPACE, "Style")))
            .filter_map(|n| n.attribute("id"))
            .map(|id| format!("#{id}"))
            .collect();
        let referenced = doc
            .descendants()
            .filter(|n| n.has_tag_name((KML_NAMESPACE, "styleUrl")))
            .filter_map(|n| n.text());
        for url in referenced {
            assert!(declared.iter().any(|d| d == url), "undeclared style {url}");
        }
    }

    #[test]
    fn details_bubble_is_raised_and_described() {
        let kml = render(&sample_map());
        let doc = roxmltree::Document::parse(&kml).unwrap();

        let bubble = doc
            .descendants()
            .filter(|n| n.has_tag_name((KML_NAMESPACE, "Placemark")))
            .find(|p| {
                kml_children(*p, "name")
                    .next()
                    .and_then(|n| n.text())
                    == Some("Node: a.example.org:8123")
            })
            .unwrap();
        let description = kml_children(bubble, "description").next().unwrap();
        assert_eq!(description.text(), Some("Version: 3.8.4<br/>Peers List: 1"));

        let point = kml_children(bubble, "Point").next().unwrap();
        let coordinates = kml_children(point, "coordinates").next().unwrap();
        assert_eq!(coordinates.text(), Some("13.4,52.5,10000"));
    }

    #[test]
    fn empty_map_is_valid_kml() {
        let map = MapDocument::build(&ScanReport::default(), &MapConfig::default());
        let kml = render(&map);
        let doc = roxmltree::Document::parse(&kml).unwrap();

        let document = kml_children(doc.root_element(), "Document").next().unwrap();
        assert_eq!(kml_children(document, "Placemark").count(), 0);
        assert_eq!(kml_children(document, "Style").count(), 0);
    }

    #[test]
    fn text_is_escaped() {
        let mut map = sample_map();
        map.name = r#"Nodes <&> "quoted" 'too'"#.to_owned();
        map.icon_href = "https://example.org/pin.svg?size=32&color=blue".to_owned();
        let kml = render(&map);
        assert!(kml.contains("<name>Nodes &lt;&amp;&gt; &quot;quoted&quot; &apos;too&apos;</name>"));

        let doc = roxmltree::Document::parse(&kml).unwrap();
        let href = doc
            .descendants()
            .find(|n| n.has_tag_name((KML_NAMESPACE, "href")))
            .unwrap();
        assert_eq!(href.text(), Some("https://example.org/pin.svg?size=32&color=blue"));
    }

    #[test]
    fn control_characters_from_nodes_are_dropped() {
        let mut noisy = node("a.example.org", &[], 52.5, 13.4);
        noisy.version = "3.8.4\u{1b}[0m\u{0}".to_owned();
        let mut report = ScanReport::default();
        report.insert(noisy.address.clone(), Probe::Reachable(noisy));
        let kml = render(&MapDocument::build(&report, &MapConfig::default()));

        let doc = roxmltree::Document::parse(&kml).unwrap();
        let description = doc
            .descendants()
            .find(|n| n.has_tag_name((KML_NAMESPACE, "description")))
            .unwrap();
        assert_eq!(description.text(), Some("Version: 3.8.4[0m<br/>Peers List: 0"));
    }

    #[test]
    fn escape_keeps_whitespace_and_wide_characters() {
        assert_eq!(escape("a\tb\r\nc"), "a\tb\r\nc");
        assert_eq!(escape("M\u{fc}nchen \u{1f30d}"), "M\u{fc}nchen \u{1f30d}");
        assert_eq!(escape("\u{7}\u{fffe}x\u{1f}"), "x");
    }
}
