// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Synthetic data file fixtures.
//!
//! Builds complete, byte-exact 3.1 and 3.2 containers holding a small but
//! fully cross-referenced dataset: two components, a map, six properties,
//! nine values, four profiles, two signatures and a three node tree. The
//! returned [Fixture] carries the offsets and counts tests assert against.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixtureVersion {
    V31,
    V32,
}

pub struct Fixture {
    pub data: Vec<u8>,
    pub version: FixtureVersion,
    pub string_count: u32,
    pub property_names: Vec<&'static str>,
    pub value_count: u32,
    pub profile_ids: Vec<u32>,
    /// Byte offsets of the profile records inside the profiles section.
    pub profile_offsets: Vec<u32>,
    /// Byte offsets of the node records inside the nodes section.
    pub node_offsets: Vec<u32>,
    pub signature_count: u32,
}

#[derive(Default)]
struct StringPool {
    data: Vec<u8>,
    count: u32,
    offsets: HashMap<&'static str, u32>,
}

impl StringPool {
    /// Intern a string, returning its byte offset in the section.
    fn add(&mut self, value: &'static str) -> u32 {
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        let offset = self.data.len() as u32;
        let stored_len = value.len() as u16 + 1;
        self.data.extend_from_slice(&stored_len.to_le_bytes());
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.count += 1;
        self.offsets.insert(value, offset);

        offset
    }
}

fn write_section(out: &mut Vec<u8>, body: &[u8], count: u32) {
    let start = out.len() as u32 + 12;
    out.extend_from_slice(&start.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(body);
}

struct PropertySpec {
    component_index: u8,
    value_type: u8,
    default_value_index: i32,
    name: &'static str,
    description: &'static str,
    first_value_index: u32,
    last_value_index: u32,
}

struct NodeSpec {
    position: i16,
    next_character_position: i16,
    parent_offset: i32,
    character_string_offset: i32,
    /// (is_string, value, related node offset)
    children: Vec<(bool, i32, i32)>,
    /// (value, related node offset)
    numeric_children: Vec<(i16, i32)>,
    ranked_signature_indexes: Vec<u32>,
    /// 3.2 only: table start index when more than one ranked signature.
    node_ranked_start: u32,
}

fn node_size(v32: bool, children: usize, numeric: usize, ranked: usize) -> u32 {
    let arrays = 9 * children as u32 + 6 * numeric as u32;

    if v32 {
        18 + arrays + if ranked > 0 { 4 } else { 0 }
    } else {
        20 + arrays + 4 * ranked as u32
    }
}

fn write_node(out: &mut Vec<u8>, v32: bool, spec: &NodeSpec) {
    out.extend_from_slice(&spec.position.to_le_bytes());
    out.extend_from_slice(&spec.next_character_position.to_le_bytes());
    out.extend_from_slice(&spec.parent_offset.to_le_bytes());
    out.extend_from_slice(&spec.character_string_offset.to_le_bytes());
    out.extend_from_slice(&(spec.children.len() as u16).to_le_bytes());
    out.extend_from_slice(&(spec.numeric_children.len() as u16).to_le_bytes());

    if v32 {
        out.extend_from_slice(&(spec.ranked_signature_indexes.len() as u16).to_le_bytes());
    } else {
        out.extend_from_slice(&(spec.ranked_signature_indexes.len() as u32).to_le_bytes());
    }

    for (is_string, value, related) in &spec.children {
        out.push(u8::from(*is_string));
        out.extend_from_slice(&value.to_le_bytes());
        out.extend_from_slice(&related.to_le_bytes());
    }

    for (value, related) in &spec.numeric_children {
        out.extend_from_slice(&value.to_le_bytes());
        out.extend_from_slice(&related.to_le_bytes());
    }

    if v32 {
        match spec.ranked_signature_indexes.len() {
            0 => {}
            1 => out.extend_from_slice(&spec.ranked_signature_indexes[0].to_le_bytes()),
            _ => out.extend_from_slice(&spec.node_ranked_start.to_le_bytes()),
        }
    } else {
        for index in &spec.ranked_signature_indexes {
            out.extend_from_slice(&index.to_le_bytes());
        }
    }
}

pub fn build(version: FixtureVersion) -> Fixture {
    let v32 = version == FixtureVersion::V32;

    let mut strings = StringPool::default();

    // Component names and headers.
    let s_hardware = strings.add("HardwarePlatform");
    let s_browser = strings.add("BrowserUA");
    let s_user_agent = strings.add("User-Agent");

    // Node character runs.
    let s_mozilla = strings.add("Mozilla");
    let s_chrome_run = strings.add("Chrome/1");

    let s_map = strings.add("Premium");

    let property_specs = [
        PropertySpec {
            component_index: 0,
            value_type: 3,
            default_value_index: 0,
            name: "IsMobile",
            description: "Indicates if the device is mobile.",
            first_value_index: 0,
            last_value_index: 0,
        },
        PropertySpec {
            component_index: 0,
            value_type: 0,
            default_value_index: -1,
            name: "HardwareVendor",
            description: "Maker of the device hardware.",
            first_value_index: 1,
            last_value_index: 2,
        },
        PropertySpec {
            component_index: 1,
            value_type: 0,
            default_value_index: -1,
            name: "BrowserName",
            description: "Name of the browser.",
            first_value_index: 3,
            last_value_index: 4,
        },
        PropertySpec {
            component_index: 1,
            value_type: 0,
            default_value_index: -1,
            name: "BrowserVersion",
            description: "Version of the browser.",
            first_value_index: 5,
            last_value_index: 5,
        },
        PropertySpec {
            component_index: 0,
            value_type: 1,
            default_value_index: -1,
            name: "ScreenPixelsWidth",
            description: "Width of the screen in pixels.",
            first_value_index: 6,
            last_value_index: 7,
        },
        PropertySpec {
            component_index: 1,
            value_type: 0,
            default_value_index: -1,
            name: "LayoutEngine",
            description: "Rendering engine of the browser.",
            first_value_index: 8,
            last_value_index: 8,
        },
    ];

    // (property index, value name)
    let value_specs: [(u16, &'static str); 9] = [
        (0, "False"),
        (1, "Acme"),
        (1, "Example"),
        (2, "Chrome"),
        (2, "Firefox"),
        (3, "100"),
        (4, "320"),
        (4, "1080"),
        (5, "Blink"),
    ];

    let property_name_offsets = property_specs
        .iter()
        .map(|p| strings.add(p.name))
        .collect::<Vec<_>>();
    let property_description_offsets = property_specs
        .iter()
        .map(|p| strings.add(p.description))
        .collect::<Vec<_>>();
    let value_name_offsets = value_specs
        .iter()
        .map(|(_, name)| strings.add(name))
        .collect::<Vec<_>>();

    // Profiles. (component, id, value indexes, signature indexes)
    let profile_specs: [(u8, u32, &[u32], &[u32]); 4] = [
        (0, 10001, &[0, 6], &[0]),
        (0, 10002, &[0, 7], &[1]),
        (1, 20001, &[3, 5, 8], &[0, 1]),
        (1, 20002, &[4, 8], &[]),
    ];

    let mut profiles_body = Vec::new();
    let mut profile_offsets = Vec::new();
    for (component, id, values, signatures) in &profile_specs {
        profile_offsets.push(profiles_body.len() as u32);

        profiles_body.push(*component);
        profiles_body.extend_from_slice(&id.to_le_bytes());
        profiles_body.extend_from_slice(&(values.len() as u32).to_le_bytes());

        let signatures: &[u32] = if v32 { signatures } else { &[] };
        profiles_body.extend_from_slice(&(signatures.len() as u32).to_le_bytes());

        for value in *values {
            profiles_body.extend_from_slice(&value.to_le_bytes());
        }
        for signature in signatures {
            profiles_body.extend_from_slice(&signature.to_le_bytes());
        }
    }

    // Components.
    let mut components_body = Vec::new();
    for (id, name_offset, default_profile) in [
        (1u32, s_hardware, profile_offsets[0]),
        (2, s_browser, profile_offsets[2]),
    ] {
        components_body.extend_from_slice(&id.to_le_bytes());
        components_body.extend_from_slice(&name_offset.to_le_bytes());
        components_body.extend_from_slice(&default_profile.to_le_bytes());

        if v32 {
            components_body.extend_from_slice(&1u16.to_le_bytes());
            components_body.extend_from_slice(&s_user_agent.to_le_bytes());
        }
    }

    // Maps.
    let mut maps_body = Vec::new();
    maps_body.extend_from_slice(&s_map.to_le_bytes());

    // Properties.
    let mut properties_body = Vec::new();
    for (index, spec) in property_specs.iter().enumerate() {
        properties_body.push(spec.component_index);
        properties_body.push(index as u8);
        properties_body.extend_from_slice(&[1, 0, 1, 0, 1]);
        properties_body.push(spec.value_type);
        properties_body.extend_from_slice(&spec.default_value_index.to_le_bytes());
        properties_body.extend_from_slice(&property_name_offsets[index].to_le_bytes());
        properties_body.extend_from_slice(&(property_description_offsets[index] as i32).to_le_bytes());
        properties_body.extend_from_slice(&(-1i32).to_le_bytes());
        properties_body.extend_from_slice(&(-1i32).to_le_bytes());
        properties_body.extend_from_slice(&spec.first_value_index.to_le_bytes());
        properties_body.extend_from_slice(&spec.last_value_index.to_le_bytes());
        properties_body.extend_from_slice(&0u32.to_le_bytes());
        properties_body.extend_from_slice(&0u32.to_le_bytes());
    }

    // Values.
    let mut values_body = Vec::new();
    for (index, (property, _)) in value_specs.iter().enumerate() {
        values_body.extend_from_slice(&property.to_le_bytes());
        values_body.extend_from_slice(&value_name_offsets[index].to_le_bytes());
        values_body.extend_from_slice(&(-1i32).to_le_bytes());
        values_body.extend_from_slice(&(-1i32).to_le_bytes());
    }

    // Nodes. Offsets computed from record sizes before writing.
    let n0_offset = 0u32;
    let n1_offset = n0_offset + node_size(v32, 1, 0, 0);
    let n2_offset = n1_offset + node_size(v32, 1, 1, 2);
    let nodes_end = n2_offset + node_size(v32, 0, 0, 1);

    let node_specs = [
        NodeSpec {
            position: -1,
            next_character_position: 0,
            parent_offset: -1,
            character_string_offset: -1,
            children: vec![(true, s_mozilla as i32, n1_offset as i32)],
            numeric_children: vec![],
            ranked_signature_indexes: vec![],
            node_ranked_start: 0,
        },
        NodeSpec {
            position: 0,
            next_character_position: 7,
            parent_offset: n0_offset as i32,
            character_string_offset: s_mozilla as i32,
            children: vec![(true, s_chrome_run as i32, n2_offset as i32)],
            numeric_children: vec![(5, n2_offset as i32)],
            ranked_signature_indexes: vec![0, 1],
            node_ranked_start: 0,
        },
        NodeSpec {
            position: 7,
            next_character_position: 15,
            parent_offset: n1_offset as i32,
            character_string_offset: s_chrome_run as i32,
            children: vec![],
            numeric_children: vec![],
            ranked_signature_indexes: vec![1],
            node_ranked_start: 0,
        },
    ];

    let mut nodes_body = Vec::new();
    for spec in &node_specs {
        write_node(&mut nodes_body, v32, spec);
    }
    assert_eq!(nodes_body.len() as u32, nodes_end);

    // Signatures: (profile offset indexes, node offsets).
    let signature_specs: [(&[i32], &[i32]); 2] = [
        (&[0, 2], &[n1_offset as i32, n2_offset as i32]),
        (&[1, 3], &[n1_offset as i32]),
    ];

    let signature_profiles_count = 2u32;
    let signature_nodes_count = 3u32;

    let mut signatures_body = Vec::new();
    let mut signature_node_offsets_table: Vec<u32> = Vec::new();
    for (sig_index, (profiles, nodes)) in signature_specs.iter().enumerate() {
        for slot in 0..signature_profiles_count as usize {
            let value = profiles.get(slot).copied().unwrap_or(-1);
            signatures_body.extend_from_slice(&value.to_le_bytes());
        }

        if v32 {
            let first = signature_node_offsets_table.len() as i32;
            for offset in *nodes {
                signature_node_offsets_table.push(*offset as u32);
            }

            signatures_body.push(nodes.len() as u8);
            signatures_body.extend_from_slice(&first.to_le_bytes());
            signatures_body.extend_from_slice(&(sig_index as u32).to_le_bytes());
            signatures_body.push(0);
        } else {
            for slot in 0..signature_nodes_count as usize {
                let value = nodes.get(slot).copied().unwrap_or(-1);
                signatures_body.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    let mut signature_node_offsets_body = Vec::new();
    for word in &signature_node_offsets_table {
        signature_node_offsets_body.extend_from_slice(&word.to_le_bytes());
    }

    // Node 1 references ranked signatures 0 and 1 through the shared table.
    let node_ranked_signature_indexes_table: [u32; 2] = [0, 1];
    let mut node_ranked_body = Vec::new();
    for word in node_ranked_signature_indexes_table {
        node_ranked_body.extend_from_slice(&word.to_le_bytes());
    }

    let ranked_signature_indexes_table: [u32; 2] = [1, 0];
    let mut ranked_body = Vec::new();
    for word in ranked_signature_indexes_table {
        ranked_body.extend_from_slice(&word.to_le_bytes());
    }

    // Root nodes: one entry point per component.
    let mut root_nodes_body = Vec::new();
    for _ in 0..2 {
        root_nodes_body.extend_from_slice(&n0_offset.to_le_bytes());
    }

    // Profile offsets.
    let mut profile_offsets_body = Vec::new();
    for (index, (_, id, _, _)) in profile_specs.iter().enumerate() {
        profile_offsets_body.extend_from_slice(&id.to_le_bytes());
        profile_offsets_body.extend_from_slice(&profile_offsets[index].to_le_bytes());
    }

    // Preamble.
    let mut out = Vec::new();
    let minor: u16 = if v32 { 2 } else { 1 };
    out.extend_from_slice(&3u16.to_le_bytes());
    out.extend_from_slice(&minor.to_le_bytes());
    out.extend_from_slice(&1712u32.to_le_bytes());
    out.extend_from_slice(&[0xab; 16]);
    let copyright = b"Test data. Not for production use.\0";
    out.extend_from_slice(&(copyright.len() as u16).to_le_bytes());
    out.extend_from_slice(copyright);
    out.extend_from_slice(&1700000000i64.to_le_bytes());
    out.extend_from_slice(&1702592000i64.to_le_bytes());
    out.extend_from_slice(&(profile_specs.len() as u32).to_le_bytes());
    out.extend_from_slice(&512u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.push(32);
    out.push(126);
    out.extend_from_slice(&(signature_specs.len() as u32).to_le_bytes());
    out.extend_from_slice(&signature_profiles_count.to_le_bytes());
    out.extend_from_slice(&signature_nodes_count.to_le_bytes());
    out.extend_from_slice(&(value_specs.len() as u16).to_le_bytes());

    // Sections in the version's declaration order.
    write_section(&mut out, &strings.data, strings.count);
    write_section(&mut out, &components_body, 2);
    write_section(&mut out, &maps_body, 1);
    write_section(&mut out, &properties_body, property_specs.len() as u32);
    write_section(&mut out, &values_body, value_specs.len() as u32);
    write_section(&mut out, &profiles_body, profile_specs.len() as u32);
    write_section(&mut out, &signatures_body, signature_specs.len() as u32);

    if v32 {
        write_section(
            &mut out,
            &signature_node_offsets_body,
            signature_node_offsets_table.len() as u32,
        );
        write_section(
            &mut out,
            &node_ranked_body,
            node_ranked_signature_indexes_table.len() as u32,
        );
    }

    write_section(&mut out, &ranked_body, ranked_signature_indexes_table.len() as u32);
    write_section(&mut out, &nodes_body, node_specs.len() as u32);
    write_section(&mut out, &root_nodes_body, 2);
    write_section(&mut out, &profile_offsets_body, profile_specs.len() as u32);

    Fixture {
        data: out,
        version,
        string_count: strings.count,
        property_names: property_specs.iter().map(|p| p.name).collect(),
        value_count: value_specs.len() as u32,
        profile_ids: profile_specs.iter().map(|p| p.1).collect(),
        profile_offsets,
        node_offsets: vec![n0_offset, n1_offset, n2_offset],
        signature_count: signature_specs.len() as u32,
    }
}
