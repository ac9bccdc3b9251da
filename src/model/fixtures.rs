// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::element::{Element, NodeKind, PortKind};
use super::geometry::{Dimension, Point};
use super::ids::{ElementId, LabelTypeId, LabelValueId};
use super::label::{LabelAssignment, LabelType, LabelTypeValue};
use crate::sync::{synchronize, SyncMode};

pub(crate) fn eid(value: &str) -> ElementId {
    ElementId::new(value).expect("element id")
}

/// Id of the label the synchronizer derives from `owner`.
pub(crate) fn derived(owner: &str, suffix: &str) -> ElementId {
    eid(owner).with_suffix(suffix)
}

/// Logical tree: customer (io) -> process (function) -> orders (storage), wired through ports.
pub(crate) fn order_flow_logical() -> Element {
    let location = LabelAssignment::new(
        LabelTypeId::new("location").expect("label type id"),
        LabelValueId::new("cloud").expect("label value id"),
    );

    let mut customer = Element::node(
        eid("customer"),
        NodeKind::InputOutput,
        Point::new(20.0, 40.0),
        "Customer",
    )
    .with_size(Dimension::new(100.0, 50.0))
    .with_child(
        Element::port(eid("customer-out"), PortKind::Output, Point::new(95.0, 20.0))
            .with_size(Dimension::new(10.0, 10.0))
            .with_behavior("forward request"),
    );
    customer.labels_mut().push(location);

    let process = Element::node(
        eid("process"),
        NodeKind::Function,
        Point::new(200.0, 40.0),
        "Process order",
    )
    .with_size(Dimension::new(120.0, 50.0))
    .with_child(
        Element::port(eid("process-in"), PortKind::Input, Point::new(-5.0, 20.0))
            .with_size(Dimension::new(10.0, 10.0)),
    )
    .with_child(
        Element::port(eid("process-out"), PortKind::Output, Point::new(115.0, 20.0))
            .with_size(Dimension::new(10.0, 10.0))
            .with_behavior("set Stored = TRUE"),
    );

    let mut orders = Element::node(
        eid("orders"),
        NodeKind::Storage,
        Point::new(400.0, 40.0),
        "Orders",
    )
    .with_size(Dimension::new(100.0, 50.0))
    .with_child(
        Element::port(eid("orders-in"), PortKind::Input, Point::new(-5.0, 20.0))
            .with_size(Dimension::new(10.0, 10.0)),
    );
    orders
        .extra_mut()
        .insert("annotation".to_owned(), serde_json::json!({ "note": "pii" }));

    Element::graph(eid("root"))
        .with_child(customer)
        .with_child(process)
        .with_child(orders)
        .with_child(
            Element::edge(eid("e1"), eid("customer-out"), eid("process-in")).with_text("order"),
        )
        .with_child(Element::edge(
            eid("e2"),
            eid("process-out"),
            eid("orders-in"),
        ))
}

pub(crate) fn order_flow_materialized() -> Element {
    synchronize(&order_flow_logical(), SyncMode::Materialize)
}

pub(crate) fn location_label_type() -> LabelType {
    LabelType::new(
        LabelTypeId::new("location").expect("label type id"),
        "Location",
        vec![
            LabelTypeValue::new(LabelValueId::new("on-prem").expect("value id"), "On-Premise"),
            LabelTypeValue::new(LabelValueId::new("cloud").expect("value id"), "Cloud"),
        ],
    )
}
