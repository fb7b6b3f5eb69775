//! The flat message format (`.protobuf` extension).
//!
//! A single [`ParameterCollection`] message holding one [`Parameter`] record
//! per variable: full path, dimensions, row-major f32 values and the
//! `need_grad` flag. The messages are small and stable, so they are derived
//! by hand rather than generated from a schema file.

use std::io::{Read, Write};

use ndarray::{ArrayD, IxDyn};
use prost::Message;

use crate::error::ParamError;
use crate::store::ParameterStore;

#[derive(Clone, PartialEq, Message)]
pub struct Shape {
    #[prost(uint64, repeated, tag = "1")]
    pub dim: Vec<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Parameter {
    #[prost(string, tag = "1")]
    pub variable_name: String,
    #[prost(message, optional, tag = "2")]
    pub shape: Option<Shape>,
    #[prost(float, repeated, tag = "3")]
    pub data: Vec<f32>,
    #[prost(bool, tag = "4")]
    pub need_grad: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct ParameterCollection {
    #[prost(message, repeated, tag = "1")]
    pub parameter: Vec<Parameter>,
}

/// Writes every parameter under the store's current scope, including those
/// with `need_grad == false`, as one encoded [`ParameterCollection`].
pub fn save<W: Write>(store: &ParameterStore, writer: &mut W) -> Result<(), ParamError> {
    let mut proto = ParameterCollection::default();
    for (path, var) in store.get_parameters(false) {
        proto.parameter.push(Parameter {
            variable_name: path,
            shape: Some(Shape {
                dim: var.shape().iter().map(|dim| *dim as u64).collect(),
            }),
            data: var.to_flat_vec(),
            need_grad: var.need_grad(),
        });
    }

    let mut buf = Vec::with_capacity(proto.encoded_len());
    proto
        .encode(&mut buf)
        .map_err(|err| ParamError::Encode(err.to_string()))?;
    writer.write_all(&buf)?;
    Ok(())
}

/// Decodes a [`ParameterCollection`] from `reader`, merging it into `proto`,
/// and registers every record in stream order.
///
/// Records are created with the default `need_grad = true`, their data is
/// overwritten bit-exactly, and `need_grad` is then set from the record, so a
/// record's flag wins over whatever the variable carried before.
pub fn load<R: Read>(
    store: &ParameterStore,
    reader: &mut R,
    proto: &mut ParameterCollection,
) -> Result<(), ParamError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    proto
        .merge(bytes.as_slice())
        .map_err(|err| ParamError::Decode(err.to_string()))?;

    for parameter in &proto.parameter {
        let shape: Vec<usize> = parameter
            .shape
            .as_ref()
            .map(|shape| shape.dim.iter().map(|dim| *dim as usize).collect())
            .unwrap_or_default();
        let var = store.get_parameter_or_create(&parameter.variable_name, &shape, None, true)?;
        let values = ArrayD::from_shape_vec(IxDyn(&shape), parameter.data.clone())
            .map_err(|err| ParamError::Decode(err.to_string()))?;
        var.set_data(values);
        var.set_need_grad(parameter.need_grad);
    }
    Ok(())
}
