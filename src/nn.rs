//! Neural Network inference.

use std::{ops::Index, path::Path, sync::Arc};

use anyhow::{bail, ensure, Context};
use image::RgbaImage;
use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TypedFact, TypedOp,
};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Describes in what order a CNN expects its input image data.
///
/// - `N` is the number of images, fixed at 1.
/// - `C` is the number of color channels, 3 for RGB inputs.
/// - `H` and `W` are the height and width of the input, respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CnnInputShape {
    /// Shape is `(N, C, H, W)`.
    NCHW,
    /// Shape is `(N, H, W, C)`.
    NHWC,
}

impl CnnInputShape {
    /// Determines the layout of a single RGB image input tensor of shape `shape`.
    ///
    /// Returns the layout together with the `(width, height)` of the image, or [`None`] if `shape`
    /// is neither layout. A shape that matches both (like `[1, 3, 3, 3]`) is taken as NCHW.
    pub fn detect(shape: &[usize]) -> Option<(Self, (usize, usize))> {
        match *shape {
            [1, 3, h, w] => Some((CnnInputShape::NCHW, (w, h))),
            [1, h, w, 3] => Some((CnnInputShape::NHWC, (w, h))),
            _ => None,
        }
    }
}

/// A convolutional neural network (CNN) that operates on RGB image data.
///
/// Color channels are mapped from `0..=255` to `[0.0, 1.0]`; the alpha channel is ignored.
pub struct Cnn {
    nn: NeuralNetwork,
    shape: CnnInputShape,
    width: u32,
    height: u32,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input, shaped like an NCHW or NHWC RGB image. The layout
    /// is read from the network.
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        ensure!(
            nn.num_inputs() == 1,
            "CNN network has to take 1 input, this one takes {}",
            nn.num_inputs(),
        );

        let input_shape = nn.input_shape(0)?;
        let Some((shape, (w, h))) = CnnInputShape::detect(&input_shape) else {
            bail!("invalid model input shape for a CNN: {:?}", input_shape);
        };
        log::trace!("CNN input is {:?} with shape {:?}", shape, input_shape);

        Ok(Self {
            nn,
            shape,
            width: w.try_into()?,
            height: h.try_into()?,
        })
    }

    pub fn input_shape(&self) -> CnnInputShape {
        self.shape
    }

    /// Returns the expected input image size as `(width, height)`.
    #[inline]
    pub fn input_resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Runs the network on an input image, returning the estimated outputs.
    ///
    /// The image's dimensions must match the CNN's [`input_resolution`][Self::input_resolution].
    pub fn estimate(&self, image: &RgbaImage) -> anyhow::Result<Outputs> {
        ensure!(
            image.dimensions() == self.input_resolution(),
            "CNN input image has size {:?}, expected {:?}",
            image.dimensions(),
            self.input_resolution(),
        );

        let (w, h) = (self.width as usize, self.height as usize);
        let shape = match self.shape {
            CnnInputShape::NCHW => [1, 3, h, w],
            CnnInputShape::NHWC => [1, h, w, 3],
        };
        let mut data = vec![0.0; 3 * w * h];
        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let index = match self.shape {
                    CnnInputShape::NCHW => c * w * h + y * w + x,
                    CnnInputShape::NHWC => (y * w + x) * 3 + c,
                };
                data[index] = map_color(pixel[c]);
            }
        }

        self.nn.estimate(&shape, data)
    }
}

fn map_color(value: u8) -> f32 {
    // Output range: 0.0 ... 1.0
    value as f32 / 255.0
}

/// A neural network that can be used for inference.
pub struct NeuralNetwork {
    inner: Model,
}

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "neural network path '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read model '{}'", path.display()))?;
        Self::from_onnx(&model_data)
            .with_context(|| format!("failed to load model '{}'", path.display()))
    }

    /// Loads a pre-trained model from an in-memory ONNX file.
    ///
    /// Returns an error if the network data is malformed or incomplete, or if the network uses
    /// unimplemented operations.
    pub fn from_onnx(raw: &[u8]) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx().model_for_read(&mut &*raw)?;
        let model = graph.into_optimized()?.into_runnable()?;
        Ok(Self { inner: model })
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.inner.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.inner.model().outputs.len()
    }

    /// Returns the concrete tensor shape of input `id`.
    pub fn input_shape(&self, id: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.inner.model().input_fact(id)?;
        match fact.shape.as_concrete() {
            Some(shape) => Ok(shape.to_vec()),
            None => bail!("network input {id} has a symbolic shape"),
        }
    }

    /// Runs the network on a single input tensor, returning the estimated outputs.
    ///
    /// `data` holds the tensor elements in row-major order.
    #[doc(alias = "infer")]
    pub fn estimate(&self, shape: &[usize], data: Vec<f32>) -> anyhow::Result<Outputs> {
        let tensor = tract_onnx::prelude::Tensor::from_shape(shape, &data)?;
        let outputs = self
            .inner
            .run(tvec![TValue::from_const(Arc::new(tensor))])?;
        let outputs = outputs
            .into_iter()
            .map(|tract| {
                OutputTensor::new(tract.shape().to_vec(), tract.as_slice::<f32>()?.to_vec())
            })
            .collect::<anyhow::Result<_>>()?;
        Ok(Outputs::new(outputs))
    }
}

/// One output tensor of a network, flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl OutputTensor {
    /// Creates a tensor from its shape and row-major elements.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> anyhow::Result<Self> {
        ensure!(
            shape.iter().product::<usize>() == data.len(),
            "tensor of shape {:?} cannot hold {} elements",
            shape,
            data.len(),
        );
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the only element of a tensor with one element.
    pub fn as_singular(&self) -> anyhow::Result<f32> {
        match &*self.data {
            &[value] => Ok(value),
            _ => bail!(
                "expected a single-element tensor, got shape {:?}",
                self.shape
            ),
        }
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: Vec<OutputTensor>,
}

impl Outputs {
    pub fn new(tensors: Vec<OutputTensor>) -> Self {
        Self { inner: tensors }
    }

    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OutputTensor> {
        self.inner.iter()
    }
}

impl Index<usize> for Outputs {
    type Output = OutputTensor;

    fn index(&self, index: usize) -> &OutputTensor {
        &self.inner[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_onnx_paths() {
        let err = NeuralNetwork::load("model.tflite").err().unwrap();
        assert!(err.to_string().contains("`.onnx` extension"), "{err}");
    }

    #[test]
    fn missing_model_is_an_error() {
        let err = NeuralNetwork::load("/nonexistent/hand_landmarker.onnx").err().unwrap();
        assert!(format!("{err:#}").contains("failed to read model"), "{err:#}");
    }

    #[test]
    fn garbage_model_is_an_error() {
        assert!(NeuralNetwork::from_onnx(b"not a model").is_err());
    }

    #[test]
    fn singular_tensor() {
        let t = OutputTensor {
            shape: vec![1, 1],
            data: vec![0.75],
        };
        assert_eq!(t.as_singular().unwrap(), 0.75);

        let t = OutputTensor {
            shape: vec![1, 2],
            data: vec![0.0, 1.0],
        };
        assert!(t.as_singular().is_err());
    }

    #[test]
    fn input_layouts() {
        assert_eq!(
            CnnInputShape::detect(&[1, 3, 256, 192]),
            Some((CnnInputShape::NCHW, (192, 256)))
        );
        assert_eq!(
            CnnInputShape::detect(&[1, 224, 224, 3]),
            Some((CnnInputShape::NHWC, (224, 224)))
        );
        assert_eq!(
            CnnInputShape::detect(&[1, 3, 3, 3]).map(|(shape, _)| shape),
            Some(CnnInputShape::NCHW)
        );
        assert_eq!(CnnInputShape::detect(&[1, 224, 224]), None);
        assert_eq!(CnnInputShape::detect(&[2, 3, 224, 224]), None);
    }

    #[test]
    fn tensor_shape_must_match_data() {
        assert!(OutputTensor::new(vec![1, 2, 3], vec![0.0; 6]).is_ok());
        assert!(OutputTensor::new(vec![1, 2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn color_mapping() {
        assert_eq!(map_color(0), 0.0);
        assert_eq!(map_color(255), 1.0);
    }
}
