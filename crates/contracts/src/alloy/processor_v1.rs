//! The original processor. Orders are keyed by `(recipient, index)` and the id
//! is `keccak256(abi.encode(recipient, index))`.

crate::bindings!(OrderProcessorV1 {
    struct Order {
        address recipient;
        address assetToken;
        address paymentToken;
        bool sell;
        uint8 orderType;
        uint256 assetTokenQuantity;
        uint256 paymentTokenQuantity;
        uint256 price;
        uint8 tif;
    }

    event OrderRequested(address indexed recipient, uint256 indexed index, Order order);
    event OrderFill(address indexed recipient, uint256 indexed index, uint256 fillAmount, uint256 receivedAmount);
    event OrderFulfilled(address indexed recipient, uint256 indexed index);
    event CancelRequested(address indexed recipient, uint256 indexed index);
    event OrderCancelled(address indexed recipient, uint256 indexed index, string reason);

    function requestOrder(Order calldata order) external returns (uint256 index);
    function requestCancel(address recipient, uint256 index) external;
    function getOrderId(address recipient, uint256 index) external pure returns (bytes32);
    function getRemainingOrder(bytes32 id) external view returns (uint256);
    function getTotalReceived(bytes32 id) external view returns (uint256);
    function isOrderActive(bytes32 id) external view returns (bool);
    function cancelRequested(bytes32 id) external view returns (bool);
    function getFeeRatesForOrder(address token) external view returns (uint256 flatFee, uint24 percentageFeeRate);

    function selfPermit(address token, address owner, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
    function multicall(bytes[] calldata data) external returns (bytes[] memory results);
});
