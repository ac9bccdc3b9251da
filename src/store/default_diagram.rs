// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Document shown at first start and on "load default diagram".
pub const DEFAULT_DOCUMENT: &str = r#"{
  "model": {
    "type": "graph",
    "id": "root",
    "children": [
      {
        "type": "node:input-output",
        "id": "customer",
        "text": "Customer",
        "position": { "x": 40, "y": 60 },
        "size": { "width": 110, "height": 50 },
        "labels": [
          { "labelTypeId": "sensitivity", "labelTypeValueId": "personal" }
        ],
        "children": [
          {
            "type": "port:dfd-output",
            "id": "customer-out",
            "behavior": "forward request",
            "position": { "x": 105, "y": 20 },
            "size": { "width": 10, "height": 10 }
          }
        ]
      },
      {
        "type": "node:function",
        "id": "validate",
        "text": "Validate order",
        "position": { "x": 240, "y": 60 },
        "size": { "width": 130, "height": 50 },
        "children": [
          {
            "type": "port:dfd-input",
            "id": "validate-in",
            "position": { "x": -5, "y": 20 },
            "size": { "width": 10, "height": 10 }
          },
          {
            "type": "port:dfd-output",
            "id": "validate-out",
            "behavior": "forward request\nset Validated = TRUE",
            "position": { "x": 125, "y": 20 },
            "size": { "width": 10, "height": 10 }
          }
        ]
      },
      {
        "type": "node:storage",
        "id": "orders",
        "text": "Orders",
        "position": { "x": 460, "y": 60 },
        "size": { "width": 110, "height": 50 },
        "labels": [
          { "labelTypeId": "location", "labelTypeValueId": "cloud" }
        ],
        "children": [
          {
            "type": "port:dfd-input",
            "id": "orders-in",
            "position": { "x": -5, "y": 20 },
            "size": { "width": 10, "height": 10 }
          }
        ]
      },
      {
        "type": "edge:arrow",
        "id": "customer-to-validate",
        "sourceId": "customer-out",
        "targetId": "validate-in",
        "text": "order"
      },
      {
        "type": "edge:arrow",
        "id": "validate-to-orders",
        "sourceId": "validate-out",
        "targetId": "orders-in",
        "text": "validated order"
      }
    ]
  },
  "labelTypes": [
    {
      "id": "location",
      "name": "Location",
      "values": [
        { "id": "on-premise", "text": "On-Premise" },
        { "id": "cloud", "text": "Cloud" }
      ]
    },
    {
      "id": "sensitivity",
      "name": "Sensitivity",
      "values": [
        { "id": "personal", "text": "Personal" },
        { "id": "public", "text": "Public" }
      ]
    }
  ],
  "editorMode": "edit"
}"#;
