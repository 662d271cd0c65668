// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod users;
pub mod currencies;
pub mod categories;
pub mod transactions;
pub mod limits;
pub mod reports;
pub mod stats;
pub mod sweep;
pub mod chat;
pub mod doctor;
